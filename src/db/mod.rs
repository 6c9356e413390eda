//! # Database: PostgreSQL Storage Layer
//!
//! Async persistence for construction stages via `sqlx::PgPool`.
//!
//! ## Schema
//!
//! - `construction_stages`: id, name, start_date, end_date, duration
//!   (`NUMERIC(12,2)`), duration_unit, color, external_id, status
//!
//! The table definition lives in `migrations/001_construction_stages.sql`.
//!
//! ## Module Structure
//!
//! - [`stages`]: stage queries and the [`crate::store::StageStore`] impl
//!
//! Enum columns are stored as text. A stored value outside the known set is a
//! data-integrity defect; conversion fails loudly rather than guessing.

mod stages;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::stage::{DurationUnit, StageRecord, StageStatus};

/// Raw row shape of `construction_stages`, before enum decoding.
#[derive(Debug, sqlx::FromRow)]
pub struct StageRow {
    pub id: i64,
    pub name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub duration_unit: Option<String>,
    pub color: Option<String>,
    pub external_id: Option<String>,
    pub status: Option<String>,
}

impl TryFrom<StageRow> for StageRecord {
    type Error = anyhow::Error;

    fn try_from(row: StageRow) -> Result<Self> {
        let duration_unit = row
            .duration_unit
            .as_deref()
            .map(str::parse::<DurationUnit>)
            .transpose()
            .with_context(|| format!("stage {} has a corrupt duration_unit", row.id))?;
        let status = row
            .status
            .as_deref()
            .map(str::parse::<StageStatus>)
            .transpose()
            .with_context(|| format!("stage {} has a corrupt status", row.id))?;
        Ok(StageRecord {
            id: row.id,
            name: row.name,
            start_date: row.start_date,
            end_date: row.end_date,
            duration: row.duration,
            duration_unit,
            color: row.color,
            external_id: row.external_id,
            status,
        })
    }
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL using the provided database URL.
    ///
    /// Credentials are percent-decoded from the URL by hand so that usernames
    /// containing dots or escaped characters survive intact.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = url::Url::parse(database_url)?;
        let username = urlencoding::decode(url.username())?.into_owned();
        let password = url
            .password()
            .map(|p| urlencoding::decode(p).map(|s| s.into_owned()))
            .transpose()?;
        let mut opts = PgConnectOptions::new()
            .host(url.host_str().unwrap_or("localhost"))
            .port(url.port().unwrap_or(5432))
            .database(url.path().trim_start_matches('/'))
            .username(&username);
        if let Some(ref pw) = password {
            opts = opts.password(pw);
        }
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        Ok(Database { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check: execute `SELECT 1` to verify database connectivity.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
