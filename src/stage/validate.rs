//! # Validate: Field Rules for Stage Payloads
//!
//! Only fields present on the payload are checked, so the same entry point
//! serves full creates and partial patches. Fields are visited in a fixed
//! order (name, startDate, endDate, durationUnit, color, externalId, status)
//! and each field runs its own rules in a fixed order. The first failing rule
//! ends validation: exactly one [`ValidationError`] is ever reported.
//!
//! A successful pass yields the typed [`StagePatch`] the payload describes, so
//! later stages never re-parse raw JSON.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::{DurationUnit, StageField, StagePatch, StagePayload, StageStatus, MAX_TEXT_LEN};

/// A single violated rule: which field, and the user-facing description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: StageField,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: StageField, message: impl Into<String>) -> Self {
        ValidationError {
            field,
            message: message.into(),
        }
    }

    pub fn end_before_start() -> Self {
        ValidationError::new(StageField::EndDate, "startDate should be smaller than endDate")
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]+Z$")
            .expect("timestamp pattern is valid")
    })
}

fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("color pattern is valid"))
}

/// Value as it is echoed back inside messages.
fn shown(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Check every present field of `payload`, stopping at the first failure.
pub fn validate(payload: &StagePayload) -> Result<StagePatch, ValidationError> {
    let mut patch = StagePatch::default();

    if let Some(ref value) = payload.name {
        patch.name = Some(check_name(value)?);
    }
    if let Some(ref value) = payload.start_date {
        patch.start_date = Some(check_timestamp(StageField::StartDate, value)?);
    }
    if let Some(ref value) = payload.end_date {
        let end_date = check_timestamp(StageField::EndDate, value)?;
        if let (Some(start), Some(end)) = (patch.start_date.flatten(), end_date) {
            if end < start {
                return Err(ValidationError::end_before_start());
            }
        }
        patch.end_date = Some(end_date);
    }
    if let Some(ref value) = payload.duration_unit {
        patch.duration_unit = Some(check_duration_unit(value)?);
    }
    if let Some(ref value) = payload.color {
        patch.color = Some(check_color(value)?);
    }
    if let Some(ref value) = payload.external_id {
        patch.external_id = Some(check_external_id(value)?);
    }
    if let Some(ref value) = payload.status {
        patch.status = Some(check_status(value)?);
    }

    Ok(patch)
}

fn check_name(value: &Value) -> Result<String, ValidationError> {
    let Value::String(name) = value else {
        return Err(ValidationError::new(
            StageField::Name,
            format!("Property name [{}] must be of type text", shown(value)),
        ));
    };
    if name.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::new(
            StageField::Name,
            format!("Property name should be smaller than {} characters.", MAX_TEXT_LEN),
        ));
    }
    Ok(name.clone())
}

/// Rules: the wire pattern, then calendar validity. `null` skips both.
fn check_timestamp(
    field: StageField,
    value: &Value,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let raw = match value {
        Value::Null => return Ok(None),
        Value::String(s) if timestamp_pattern().is_match(s) => s,
        other => {
            return Err(ValidationError::new(
                field,
                format!(
                    "Property {} [{}] doesn't match the correct date format",
                    field,
                    shown(other)
                ),
            ));
        }
    };
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.fZ")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|_| {
            ValidationError::new(field, format!("Property {} isn't a valid date [{}]", field, raw))
        })
}

fn check_duration_unit(value: &Value) -> Result<Option<DurationUnit>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => s.parse().map(Some).map_err(|_| unit_error(value)),
        _ => Err(unit_error(value)),
    }
}

fn unit_error(value: &Value) -> ValidationError {
    ValidationError::new(
        StageField::DurationUnit,
        format!(
            "Property durationUnit [{}] can only be equal to HOURS, DAYS or WEEKS",
            shown(value)
        ),
    )
}

fn check_color(value: &Value) -> Result<Option<String>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if color_pattern().is_match(s) => Ok(Some(s.clone())),
        _ => Err(ValidationError::new(
            StageField::Color,
            format!("Property color [{}] isn't in valid format", shown(value)),
        )),
    }
}

/// `null` is accepted here: the external identifier is optional.
fn check_external_id(value: &Value) -> Result<Option<String>, ValidationError> {
    let external_id = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s,
        other => {
            return Err(ValidationError::new(
                StageField::ExternalId,
                format!("Property externalId [{}] must be of type text", shown(other)),
            ));
        }
    };
    if external_id.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::new(
            StageField::ExternalId,
            format!("Property externalId must be smaller than {} characters", MAX_TEXT_LEN),
        ));
    }
    Ok(Some(external_id.clone()))
}

fn check_status(value: &Value) -> Result<Option<StageStatus>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => s.parse().map(Some).map_err(|_| status_error(value)),
        _ => Err(status_error(value)),
    }
}

fn status_error(value: &Value) -> ValidationError {
    ValidationError::new(
        StageField::Status,
        format!(
            "Property status [{}] can only be equal to NEW, PLANNED or DELETED",
            shown(value)
        ),
    )
}
