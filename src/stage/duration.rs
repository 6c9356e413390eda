//! # Duration: Derived Stage Length
//!
//! Computes a stage's duration from its start and end timestamps in the
//! requested [`DurationUnit`]. Runs only on values that already passed
//! validation and performs no validation of its own.
//!
//! ## Algorithm
//!
//! 1. Either date missing: duration becomes null, nothing else changes.
//! 2. Missing unit defaults to days, and the default is kept on the output.
//! 3. Both dates are truncated to the whole hour; the truncated values replace
//!    the inputs.
//! 4. The truncated span in seconds is divided by the unit length and rounded
//!    to two decimals, with exact halves rounding down.
//!
//! Rounding is done on integers (span seconds over unit seconds), so there is
//! no binary floating point error in tie detection: a span of 3 hours in days
//! is exactly 0.125 and becomes 0.12.

use chrono::{DateTime, TimeDelta, Timelike, Utc};

use super::DurationUnit;

/// The schedule-related slice of a stage: the calculator's input and output.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Schedule {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub duration_unit: Option<DurationUnit>,
    pub duration: Option<f64>,
}

/// A schedule that should have been rejected before reaching the calculator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalculationError {
    NegativeSpan {
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    },
}

impl std::fmt::Display for CalculationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalculationError::NegativeSpan {
                start_date,
                end_date,
            } => write!(
                f,
                "end date {} precedes start date {} after validation",
                end_date, start_date
            ),
        }
    }
}

impl std::error::Error for CalculationError {}

/// Derive the duration of `schedule`, normalizing its dates and unit.
pub fn calculate(schedule: Schedule) -> Result<Schedule, CalculationError> {
    let (Some(start), Some(end)) = (schedule.start_date, schedule.end_date) else {
        return Ok(Schedule {
            duration: None,
            ..schedule
        });
    };

    let unit = schedule.duration_unit.unwrap_or(DurationUnit::Days);
    let start = truncate_to_hour(start);
    let end = truncate_to_hour(end);

    let span = (end - start).num_seconds();
    if span < 0 {
        return Err(CalculationError::NegativeSpan {
            start_date: start,
            end_date: end,
        });
    }

    let hundredths = round_half_down(span, unit.seconds());
    Ok(Schedule {
        start_date: Some(start),
        end_date: Some(end),
        duration_unit: Some(unit),
        duration: Some(hundredths as f64 / 100.0),
    })
}

/// Drop minutes, seconds and sub-second components.
pub fn truncate_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    let past_hour = i64::from(ts.minute()) * 60 + i64::from(ts.second());
    ts - TimeDelta::seconds(past_hour) - TimeDelta::nanoseconds(i64::from(ts.nanosecond()))
}

/// `numerator / denominator` in hundredths, exact halves rounding down.
///
/// Both operands must be non-negative and `denominator` non-zero.
pub fn round_half_down(numerator: i64, denominator: i64) -> i64 {
    let scaled = i128::from(numerator) * 100;
    let denominator = i128::from(denominator);
    let quotient = scaled / denominator;
    let remainder = scaled % denominator;
    let rounded = if remainder * 2 > denominator {
        quotient + 1
    } else {
        quotient
    };
    rounded as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn defaults_to_days_and_truncates_dates() {
        let out = calculate(Schedule {
            start_date: Some(at(2024, 1, 1, 10, 30, 0)),
            end_date: Some(at(2024, 1, 2, 10, 30, 0)),
            duration_unit: None,
            duration: None,
        })
        .unwrap();
        assert_eq!(out.start_date, Some(at(2024, 1, 1, 10, 0, 0)));
        assert_eq!(out.end_date, Some(at(2024, 1, 2, 10, 0, 0)));
        assert_eq!(out.duration_unit, Some(DurationUnit::Days));
        assert_eq!(out.duration, Some(1.0));
    }

    #[test]
    fn missing_date_nulls_duration_and_keeps_unit() {
        let input = Schedule {
            start_date: Some(at(2024, 1, 1, 10, 30, 0)),
            end_date: None,
            duration_unit: None,
            duration: Some(4.0),
        };
        let out = calculate(input).unwrap();
        assert_eq!(out.duration, None);
        assert_eq!(out.duration_unit, None);
        assert_eq!(out.start_date, input.start_date);

        let out = calculate(Schedule {
            start_date: None,
            end_date: Some(at(2024, 1, 1, 10, 30, 0)),
            duration_unit: Some(DurationUnit::Weeks),
            duration: None,
        })
        .unwrap();
        assert_eq!(out.duration, None);
        assert_eq!(out.duration_unit, Some(DurationUnit::Weeks));
    }

    #[test]
    fn converts_to_each_unit() {
        let start = Some(at(2024, 1, 1, 0, 0, 0));
        let end = Some(at(2024, 1, 8, 0, 0, 0));
        let expected = [
            (DurationUnit::Hours, 168.0),
            (DurationUnit::Days, 7.0),
            (DurationUnit::Weeks, 1.0),
        ];
        for (unit, duration) in expected {
            let out = calculate(Schedule {
                start_date: start,
                end_date: end,
                duration_unit: Some(unit),
                duration: None,
            })
            .unwrap();
            assert_eq!(out.duration, Some(duration), "unit {}", unit);
        }
    }

    #[test]
    fn truncation_can_change_the_span() {
        // 09:59 -> 10:01 is two minutes, but truncates to 09:00 -> 10:00.
        let out = calculate(Schedule {
            start_date: Some(at(2024, 5, 1, 9, 59, 0)),
            end_date: Some(at(2024, 5, 1, 10, 1, 0)),
            duration_unit: Some(DurationUnit::Hours),
            duration: None,
        })
        .unwrap();
        assert_eq!(out.duration, Some(1.0));
    }

    #[test]
    fn exact_half_rounds_down() {
        // 3 hours is 0.125 days.
        let out = calculate(Schedule {
            start_date: Some(at(2024, 1, 1, 0, 0, 0)),
            end_date: Some(at(2024, 1, 1, 3, 0, 0)),
            duration_unit: Some(DurationUnit::Days),
            duration: None,
        })
        .unwrap();
        assert_eq!(out.duration, Some(0.12));
    }

    #[test]
    fn round_half_down_cases() {
        assert_eq!(round_half_down(2345, 1000), 234);
        assert_eq!(round_half_down(2346, 1000), 235);
        assert_eq!(round_half_down(2344, 1000), 234);
        assert_eq!(round_half_down(1, 3), 33);
        assert_eq!(round_half_down(2, 3), 67);
        assert_eq!(round_half_down(0, 7), 0);
        assert_eq!(round_half_down(5 * 3600, 7 * 86400), 3);
    }

    #[test]
    fn truncate_to_hour_drops_subsecond_precision() {
        let ts = Utc.timestamp_opt(1_704_105_045, 987_654_321).unwrap();
        assert_eq!(truncate_to_hour(ts), at(2024, 1, 1, 10, 0, 0));
        assert_eq!(truncate_to_hour(at(2024, 1, 1, 10, 0, 0)), at(2024, 1, 1, 10, 0, 0));
    }

    #[test]
    fn negative_span_is_an_invariant_violation() {
        let err = calculate(Schedule {
            start_date: Some(at(2024, 1, 2, 0, 0, 0)),
            end_date: Some(at(2024, 1, 1, 0, 0, 0)),
            duration_unit: None,
            duration: None,
        })
        .unwrap_err();
        assert!(matches!(err, CalculationError::NegativeSpan { .. }));
    }
}
