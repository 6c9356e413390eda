//! Presence-tracked raw candidate for create and patch requests.
//!
//! Each field is kept as an untyped JSON value so the validator can report
//! type mismatches itself. `None` means the field was not supplied;
//! `Some(Value::Null)` means it was supplied as an explicit `null`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::StageStatus;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePayload {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub start_date: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub end_date: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub duration_unit: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub color: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub external_id: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub status: Option<Value>,
}

/// Keeps an explicit `null` distinguishable from a missing key.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl StagePayload {
    /// Make every field present, as a create request requires.
    ///
    /// Missing fields become `null`, except `status`, which starts at `NEW`.
    pub fn for_create(mut self) -> Self {
        for field in [
            &mut self.name,
            &mut self.start_date,
            &mut self.end_date,
            &mut self.duration_unit,
            &mut self.color,
            &mut self.external_id,
        ] {
            field.get_or_insert(Value::Null);
        }
        self.status
            .get_or_insert_with(|| Value::String(StageStatus::New.as_str().to_string()));
        self
    }
}
