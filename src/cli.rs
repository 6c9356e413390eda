//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Contains the
//! execution logic for each subcommand.

use anyhow::{Context, Result};
use construction_stages::service::{prepare_create, StageError, StageService};
use construction_stages::stage::StagePayload;
use construction_stages::store::MemoryStore;
use construction_stages::{db, server};
use std::path::Path;
use tracing::{info, warn};

use super::Cli;

fn database_url(cli: &Cli) -> Result<&str> {
    cli.database_url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("DATABASE_URL is required (set via --database-url or env)")
    })
}

async fn connect_service(cli: &Cli) -> Result<StageService<db::Database>> {
    let database = db::Database::connect(database_url(cli)?).await?;
    Ok(StageService::new(database).with_duration_basis(cli.patch_duration_basis))
}

/// Stage errors carry their own wording; only storage failures get context.
fn describe(err: StageError) -> anyhow::Error {
    match err {
        StageError::Validation(e) => anyhow::anyhow!("{}: {}", e.field, e.message),
        StageError::Storage(e) => e.context("stage storage failed"),
        other => anyhow::anyhow!(other),
    }
}

pub async fn run_serve(cli: &Cli, port: u16, in_memory: bool) -> Result<()> {
    if in_memory {
        warn!("serving from an in-memory store; stages are lost on exit");
        let service = StageService::new(MemoryStore::new())
            .with_duration_basis(cli.patch_duration_basis);
        return server::run(service, port).await;
    }
    let service = connect_service(cli).await?;
    info!("connected to PostgreSQL");
    server::run(service, port).await
}

/// Validate and calculate a create payload offline, printing the result.
pub fn run_check(file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let payload: StagePayload = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON stage payload", file.display()))?;
    let stage = prepare_create(payload).map_err(describe)?;
    println!("{}", serde_json::to_string_pretty(&stage)?);
    Ok(())
}

pub async fn run_list(cli: &Cli) -> Result<()> {
    let service = connect_service(cli).await?;
    let stages = service.list_all().await.map_err(describe)?;
    println!("{}", serde_json::to_string_pretty(&stages)?);
    Ok(())
}

pub async fn run_show(cli: &Cli, id: i64) -> Result<()> {
    let service = connect_service(cli).await?;
    let stage = service.get_by_id(id).await.map_err(describe)?;
    println!("{}", serde_json::to_string_pretty(&stage)?);
    Ok(())
}

pub async fn run_delete(cli: &Cli, id: i64) -> Result<()> {
    let service = connect_service(cli).await?;
    let stage = service.delete(id).await.map_err(describe)?;
    info!(id, "stage marked DELETED");
    println!("{}", serde_json::to_string_pretty(&stage)?);
    Ok(())
}
