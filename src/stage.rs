//! # Stage: Construction Stage Domain Types
//!
//! A construction stage is a scheduled span of work: a name, optional start and
//! end timestamps, a derived duration expressed in a chosen unit, a color tag,
//! an external identifier, and a lifecycle status.
//!
//! ## Shapes
//!
//! - [`StageRecord`]: a stored stage as read back from the store.
//! - [`NewStage`]: a fully populated stage ready for insertion.
//! - [`StagePatch`]: a partial update; every field carries its own presence.
//!
//! Incoming JSON never maps straight onto these types. It is first captured as
//! a [`payload::StagePayload`], checked by [`validate::validate`], and only
//! then turned into a typed patch. Duration is never accepted from callers; it
//! is always recomputed by [`duration::calculate`].
//!
//! ## Timestamps
//!
//! All timestamps are UTC. On read they serialize as `YYYY-MM-DDTHH:MM:SSZ`
//! without fractional seconds.

pub mod duration;
pub mod payload;
pub mod validate;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::str::FromStr;

pub use duration::{calculate, CalculationError, Schedule};
pub use payload::StagePayload;
pub use validate::{validate, ValidationError};

/// Canonical read format for stage timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Maximum length (in characters) of `name` and `externalId`.
pub const MAX_TEXT_LEN: usize = 255;

/// Render a timestamp in the canonical read format.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn serialize_timestamp<S: Serializer>(
    ts: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match ts {
        Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
        None => serializer.serialize_none(),
    }
}

// ── Enumerations ────────────────────────────────────────────────

/// Granularity in which a stage's duration is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DurationUnit {
    Hours,
    Days,
    Weeks,
}

impl DurationUnit {
    pub const ALL: [DurationUnit; 3] = [DurationUnit::Hours, DurationUnit::Days, DurationUnit::Weeks];

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Hours => "HOURS",
            DurationUnit::Days => "DAYS",
            DurationUnit::Weeks => "WEEKS",
        }
    }

    /// Length of one unit in seconds.
    pub fn seconds(&self) -> i64 {
        match self {
            DurationUnit::Hours => 60 * 60,
            DurationUnit::Days => 60 * 60 * 24,
            DurationUnit::Weeks => 60 * 60 * 24 * 7,
        }
    }
}

impl std::fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurationUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HOURS" => Ok(DurationUnit::Hours),
            "DAYS" => Ok(DurationUnit::Days),
            "WEEKS" => Ok(DurationUnit::Weeks),
            other => Err(anyhow::anyhow!("unknown duration unit: {}", other)),
        }
    }
}

/// Lifecycle status. Deletion is a status change, never a physical removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageStatus {
    New,
    Planned,
    Deleted,
}

impl StageStatus {
    pub const ALL: [StageStatus; 3] = [StageStatus::New, StageStatus::Planned, StageStatus::Deleted];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::New => "NEW",
            StageStatus::Planned => "PLANNED",
            StageStatus::Deleted => "DELETED",
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(StageStatus::New),
            "PLANNED" => Ok(StageStatus::Planned),
            "DELETED" => Ok(StageStatus::Deleted),
            other => Err(anyhow::anyhow!("unknown stage status: {}", other)),
        }
    }
}

/// Caller-settable fields, in the order the validator visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageField {
    Name,
    StartDate,
    EndDate,
    DurationUnit,
    Color,
    ExternalId,
    Status,
}

impl StageField {
    /// Wire name of the field (camelCase, as it appears in JSON payloads).
    pub fn as_str(&self) -> &'static str {
        match self {
            StageField::Name => "name",
            StageField::StartDate => "startDate",
            StageField::EndDate => "endDate",
            StageField::DurationUnit => "durationUnit",
            StageField::Color => "color",
            StageField::ExternalId => "externalId",
            StageField::Status => "status",
        }
    }
}

impl std::fmt::Display for StageField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Records ─────────────────────────────────────────────────────

/// A stored construction stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub id: i64,
    pub name: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub duration_unit: Option<DurationUnit>,
    pub color: Option<String>,
    pub external_id: Option<String>,
    pub status: Option<StageStatus>,
}

impl StageRecord {
    pub fn from_new(id: i64, stage: NewStage) -> Self {
        StageRecord {
            id,
            name: stage.name,
            start_date: stage.start_date,
            end_date: stage.end_date,
            duration: stage.duration,
            duration_unit: stage.duration_unit,
            color: stage.color,
            external_id: stage.external_id,
            status: stage.status,
        }
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            start_date: self.start_date,
            end_date: self.end_date,
            duration_unit: self.duration_unit,
            duration: self.duration,
        }
    }

    /// Overwrite the fields a patch carries, leaving the rest untouched.
    pub fn apply(&mut self, patch: &StagePatch) {
        if let Some(ref name) = patch.name {
            self.name = name.clone();
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if let Some(duration) = patch.duration {
            self.duration = duration;
        }
        if let Some(duration_unit) = patch.duration_unit {
            self.duration_unit = duration_unit;
        }
        if let Some(ref color) = patch.color {
            self.color = color.clone();
        }
        if let Some(ref external_id) = patch.external_id {
            self.external_id = external_id.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

/// A fully populated stage that has passed validation and duration calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStage {
    pub name: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub end_date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub duration_unit: Option<DurationUnit>,
    pub color: Option<String>,
    pub external_id: Option<String>,
    pub status: Option<StageStatus>,
}

/// A validated partial update.
///
/// The outer `Option` is presence (was the field supplied at all); the inner
/// `Option` on nullable fields is the value itself, so `Some(None)` means
/// "set to null".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagePatch {
    pub name: Option<String>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub duration: Option<Option<f64>>,
    pub duration_unit: Option<Option<DurationUnit>>,
    pub color: Option<Option<String>>,
    pub external_id: Option<Option<String>>,
    pub status: Option<Option<StageStatus>>,
}

impl StagePatch {
    pub fn is_empty(&self) -> bool {
        *self == StagePatch::default()
    }

    /// True when the patch supplies any input of the duration calculation.
    pub fn touches_schedule(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some() || self.duration_unit.is_some()
    }

    /// Schedule as seen by the patch alone: absent dates count as null.
    pub fn schedule(&self) -> Schedule {
        Schedule {
            start_date: self.start_date.flatten(),
            end_date: self.end_date.flatten(),
            duration_unit: self.duration_unit.flatten(),
            duration: self.duration.flatten(),
        }
    }

    /// Schedule of `record` with this patch's schedule fields laid over it.
    pub fn schedule_over(&self, record: &StageRecord) -> Schedule {
        Schedule {
            start_date: self.start_date.unwrap_or(record.start_date),
            end_date: self.end_date.unwrap_or(record.end_date),
            duration_unit: self.duration_unit.unwrap_or(record.duration_unit),
            duration: record.duration,
        }
    }

    /// Write a calculated schedule back onto the patch.
    ///
    /// Duration is always written. Dates and unit are written only when a
    /// duration was derived, since that is the only case in which the
    /// calculator normalizes them.
    pub fn set_schedule(&mut self, schedule: Schedule) {
        self.duration = Some(schedule.duration);
        if schedule.duration.is_some() {
            self.start_date = Some(schedule.start_date);
            self.end_date = Some(schedule.end_date);
            self.duration_unit = Some(schedule.duration_unit);
        }
    }

    /// Collapse a create patch into a full stage. Absent fields become null.
    pub fn into_new_stage(self) -> NewStage {
        NewStage {
            name: self.name.unwrap_or_default(),
            start_date: self.start_date.flatten(),
            end_date: self.end_date.flatten(),
            duration: self.duration.flatten(),
            duration_unit: self.duration_unit.flatten(),
            color: self.color.flatten(),
            external_id: self.external_id.flatten(),
            status: self.status.flatten(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> StageRecord {
        StageRecord {
            id: 7,
            name: "Foundation".to_string(),
            start_date: Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2024, 3, 3, 8, 0, 0).unwrap()),
            duration: Some(2.0),
            duration_unit: Some(DurationUnit::Days),
            color: Some("#A1B2C3".to_string()),
            external_id: Some("EXT-1".to_string()),
            status: Some(StageStatus::New),
        }
    }

    #[test]
    fn record_serializes_camel_case_with_second_precision() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["startDate"], "2024-03-01T08:00:00Z");
        assert_eq!(json["endDate"], "2024-03-03T08:00:00Z");
        assert_eq!(json["durationUnit"], "DAYS");
        assert_eq!(json["externalId"], "EXT-1");
        assert_eq!(json["status"], "NEW");
        assert_eq!(json["duration"], 2.0);
    }

    #[test]
    fn fractional_seconds_are_dropped_on_read() {
        let ts = Utc.timestamp_opt(1_704_103_845, 500_000_000).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-01T10:10:45Z");
    }

    #[test]
    fn null_fields_serialize_as_null() {
        let mut r = record();
        r.start_date = None;
        r.duration = None;
        let json = serde_json::to_value(r).unwrap();
        assert!(json["startDate"].is_null());
        assert!(json["duration"].is_null());
    }

    #[test]
    fn enums_round_trip_through_strings() {
        for unit in DurationUnit::ALL {
            assert_eq!(unit.as_str().parse::<DurationUnit>().unwrap(), unit);
        }
        for status in StageStatus::ALL {
            assert_eq!(status.as_str().parse::<StageStatus>().unwrap(), status);
        }
        assert!("MONTHS".parse::<DurationUnit>().is_err());
        assert!("new".parse::<StageStatus>().is_err());
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut r = record();
        let patch = StagePatch {
            color: Some(None),
            status: Some(Some(StageStatus::Planned)),
            ..Default::default()
        };
        r.apply(&patch);
        assert_eq!(r.color, None);
        assert_eq!(r.status, Some(StageStatus::Planned));
        assert_eq!(r.name, "Foundation");
        assert_eq!(r.duration, Some(2.0));
    }

    #[test]
    fn set_schedule_without_duration_keeps_dates_untouched() {
        let mut patch = StagePatch {
            end_date: Some(Some(Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap())),
            ..Default::default()
        };
        let before = patch.end_date;
        patch.set_schedule(patch.schedule());
        assert_eq!(patch.duration, Some(None));
        assert_eq!(patch.end_date, before);
        assert_eq!(patch.start_date, None);
        assert_eq!(patch.duration_unit, None);
    }

    #[test]
    fn schedule_over_prefers_patch_values() {
        let r = record();
        let patch = StagePatch {
            end_date: Some(Some(Utc.with_ymd_and_hms(2024, 3, 8, 8, 0, 0).unwrap())),
            ..Default::default()
        };
        let s = patch.schedule_over(&r);
        assert_eq!(s.start_date, r.start_date);
        assert_eq!(s.end_date, Some(Utc.with_ymd_and_hms(2024, 3, 8, 8, 0, 0).unwrap()));
        assert_eq!(s.duration_unit, Some(DurationUnit::Days));
    }
}
