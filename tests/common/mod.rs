//! Shared test helpers for integration tests.

#![allow(dead_code)]

use construction_stages::db::Database;
use construction_stages::server::{build_router, AppState};
use construction_stages::service::{DurationBasis, StageService};
use construction_stages::store::MemoryStore;
use std::sync::Once;

/// Returns the test database URL from the `TEST_DATABASE_URL` environment variable.
/// Panics if the variable is not set.
pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for integration tests")
}

/// Returns true if the test database URL is configured.
pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// One-time schema initialization.
static SCHEMA_INIT: Once = Once::new();

/// Ensure the test database schema is set up (runs the migration once per test suite).
pub fn ensure_schema() {
    SCHEMA_INIT.call_once(|| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let pool = sqlx::PgPool::connect(&test_db_url()).await.unwrap();
            run_migrations(&pool).await;
        });
    });
}

/// Connect to the test database with an empty `construction_stages` table.
pub async fn setup_test_db() -> Database {
    ensure_schema();
    let db = Database::connect(&test_db_url())
        .await
        .expect("Failed to connect to test database");
    truncate_all_tables(db.pool()).await;
    db
}

/// Axum router over a fresh in-memory store.
pub fn build_memory_app() -> axum::Router {
    build_memory_app_with(DurationBasis::Patch)
}

pub fn build_memory_app_with(basis: DurationBasis) -> axum::Router {
    let service = StageService::new(MemoryStore::new()).with_duration_basis(basis);
    build_router(AppState::new(service))
}

/// Axum router connected to the test database.
pub async fn build_test_app() -> axum::Router {
    let db = setup_test_db().await;
    build_router(AppState::new(StageService::new(db)))
}

/// Truncate tables and restart id sequences so every test starts at id 1.
pub async fn truncate_all_tables(pool: &sqlx::PgPool) {
    sqlx::raw_sql("TRUNCATE TABLE construction_stages RESTART IDENTITY")
        .execute(pool)
        .await
        .unwrap();
}

async fn run_migrations(pool: &sqlx::PgPool) {
    let migration_files = ["migrations/001_construction_stages.sql"];

    for file in &migration_files {
        let path = std::path::Path::new(file);
        if !path.exists() {
            panic!("Migration file not found: {}", file);
        }
        let sql = std::fs::read_to_string(path).unwrap();
        sqlx::raw_sql(&sql).execute(pool).await.unwrap_or_else(|e| {
            panic!("Migration {} failed: {}", file, e);
        });
    }
}
