//! Construction stage queries.
//!
//! Reads cast `duration` to `FLOAT8` so it decodes straight into `f64`; writes
//! cast it back to `NUMERIC(12, 2)`. Partial updates build their `SET` list
//! from the fields present in the patch, numbering parameters in the same
//! order they are bound.

use anyhow::Result;
use tracing::error;

use super::{Database, StageRow};
use crate::stage::{NewStage, StagePatch, StageRecord, StageStatus};
use crate::store::StageStore;

const SELECT_STAGES: &str = "SELECT id, name, start_date, end_date,
            duration::FLOAT8 AS duration, duration_unit, color, external_id, status
     FROM construction_stages";

fn decode(row: StageRow) -> Result<StageRecord> {
    let id = row.id;
    StageRecord::try_from(row).inspect_err(|e| {
        error!(id, error = %e, "construction_stages row failed to decode");
    })
}

/// Columns written by a patch, in binding order.
fn patch_columns(patch: &StagePatch) -> Vec<&'static str> {
    let mut columns = Vec::new();
    if patch.name.is_some() {
        columns.push("name");
    }
    if patch.start_date.is_some() {
        columns.push("start_date");
    }
    if patch.end_date.is_some() {
        columns.push("end_date");
    }
    if patch.duration.is_some() {
        columns.push("duration");
    }
    if patch.duration_unit.is_some() {
        columns.push("duration_unit");
    }
    if patch.color.is_some() {
        columns.push("color");
    }
    if patch.external_id.is_some() {
        columns.push("external_id");
    }
    if patch.status.is_some() {
        columns.push("status");
    }
    columns
}

/// `UPDATE` statement for a patch, or `None` when it writes nothing.
fn update_sql(patch: &StagePatch) -> Option<String> {
    let columns = patch_columns(patch);
    if columns.is_empty() {
        return None;
    }
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| match *column {
            "duration" => format!("duration = ${}::NUMERIC(12, 2)", i + 1),
            other => format!("{} = ${}", other, i + 1),
        })
        .collect();
    Some(format!(
        "UPDATE construction_stages SET {} WHERE id = ${}",
        assignments.join(", "),
        columns.len() + 1
    ))
}

impl Database {
    /// All stages ordered by id.
    pub async fn get_stages(&self) -> Result<Vec<StageRecord>> {
        let rows = sqlx::query_as::<_, StageRow>(&format!("{} ORDER BY id", SELECT_STAGES))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(decode).collect()
    }

    pub async fn get_stage(&self, id: i64) -> Result<Option<StageRecord>> {
        let row = sqlx::query_as::<_, StageRow>(&format!("{} WHERE id = $1", SELECT_STAGES))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(decode).transpose()
    }

    /// Insert a stage and return the generated id.
    pub async fn insert_stage(&self, stage: &NewStage) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO construction_stages
                (name, start_date, end_date, duration, duration_unit, color, external_id, status)
             VALUES ($1, $2, $3, $4::NUMERIC(12, 2), $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(&stage.name)
        .bind(stage.start_date)
        .bind(stage.end_date)
        .bind(stage.duration)
        .bind(stage.duration_unit.map(|u| u.as_str()))
        .bind(stage.color.as_deref())
        .bind(stage.external_id.as_deref())
        .bind(stage.status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Write the fields present in `patch`. Returns false if the id is unknown.
    pub async fn update_stage(&self, id: i64, patch: &StagePatch) -> Result<bool> {
        let Some(sql) = update_sql(patch) else {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM construction_stages WHERE id = $1)",
            )
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
            return Ok(exists);
        };

        let mut query = sqlx::query(&sql);
        if let Some(ref name) = patch.name {
            query = query.bind(name);
        }
        if let Some(start_date) = patch.start_date {
            query = query.bind(start_date);
        }
        if let Some(end_date) = patch.end_date {
            query = query.bind(end_date);
        }
        if let Some(duration) = patch.duration {
            query = query.bind(duration);
        }
        if let Some(duration_unit) = patch.duration_unit {
            query = query.bind(duration_unit.map(|u| u.as_str()));
        }
        if let Some(ref color) = patch.color {
            query = query.bind(color.as_deref());
        }
        if let Some(ref external_id) = patch.external_id {
            query = query.bind(external_id.as_deref());
        }
        if let Some(status) = patch.status {
            query = query.bind(status.map(|s| s.as_str()));
        }
        let result = query.bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite only `status`. Returns false if the id is unknown.
    pub async fn set_stage_status(&self, id: i64, status: StageStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE construction_stages SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl StageStore for Database {
    async fn fetch_all(&self) -> Result<Vec<StageRecord>> {
        self.get_stages().await
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<StageRecord>> {
        self.get_stage(id).await
    }

    async fn insert(&self, stage: &NewStage) -> Result<i64> {
        self.insert_stage(stage).await
    }

    async fn update_by_id(&self, id: i64, patch: &StagePatch) -> Result<bool> {
        self.update_stage(id, patch).await
    }

    async fn set_status(&self, id: i64, status: StageStatus) -> Result<bool> {
        self.set_stage_status(id, status).await
    }

    async fn health_check(&self) -> Result<()> {
        Database::health_check(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_has_no_statement() {
        assert_eq!(update_sql(&StagePatch::default()), None);
    }

    #[test]
    fn update_numbers_parameters_in_binding_order() {
        let patch = StagePatch {
            name: Some("Roof".to_string()),
            duration: Some(None),
            status: Some(Some(StageStatus::Planned)),
            ..Default::default()
        };
        assert_eq!(
            update_sql(&patch).unwrap(),
            "UPDATE construction_stages SET name = $1, duration = $2::NUMERIC(12, 2), status = $3 WHERE id = $4"
        );
    }

    #[test]
    fn patch_columns_follow_field_order() {
        let patch = StagePatch {
            external_id: Some(None),
            start_date: Some(None),
            color: Some(Some("#000000".to_string())),
            ..Default::default()
        };
        assert_eq!(patch_columns(&patch), vec!["start_date", "color", "external_id"]);
    }
}
