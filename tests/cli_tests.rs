//! CLI integration tests using assert_cmd.
//!
//! Tests without database: always run (help, arg validation, `check`).
//! Tests with database: gated on TEST_DATABASE_URL environment variable.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[allow(deprecated)]
fn stages() -> Command {
    Command::cargo_bin("construction-stages").unwrap()
}

fn payload_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// --- Help and arg validation (no database needed) ---

#[test]
fn help_shows_all_subcommands() {
    stages().arg("--help").assert().success().stdout(
        predicate::str::contains("serve")
            .and(predicate::str::contains("check"))
            .and(predicate::str::contains("list"))
            .and(predicate::str::contains("show"))
            .and(predicate::str::contains("delete")),
    );
}

#[test]
fn help_serve_shows_args() {
    stages()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--port").and(predicate::str::contains("--in-memory")));
}

#[test]
fn help_lists_duration_basis_values() {
    stages()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--patch-duration-basis"));
}

#[test]
fn unknown_duration_basis_is_rejected() {
    stages()
        .args(["--patch-duration-basis", "sideways", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn show_requires_id() {
    stages().arg("show").assert().failure();
}

#[test]
fn list_without_database_url_fails() {
    stages()
        .env_remove("DATABASE_URL")
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL is required"));
}

// --- Offline payload check ---

#[test]
fn check_prints_calculated_stage() {
    let file = payload_file(
        r#"{
            "name": "Stage A",
            "startDate": "2024-01-01T00:00:00.000Z",
            "endDate": "2024-01-08T00:00:00.000Z",
            "durationUnit": "WEEKS",
            "color": null,
            "externalId": null,
            "status": "NEW"
        }"#,
    );
    stages()
        .args(["check", "--file"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"duration\": 1.0")
                .and(predicate::str::contains("\"durationUnit\": \"WEEKS\""))
                .and(predicate::str::contains("\"startDate\": \"2024-01-01T00:00:00Z\"")),
        );
}

#[test]
fn check_defaults_status_to_new() {
    let file = payload_file(r#"{"name": "Stage B"}"#);
    stages()
        .args(["check", "--file"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"status\": \"NEW\"")
                .and(predicate::str::contains("\"duration\": null")),
        );
}

#[test]
fn check_reports_failing_field() {
    let file = payload_file(r#"{"name": "Stage C", "color": "blue"}"#);
    stages()
        .args(["check", "--file"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("color: Property color [blue] isn't in valid format"));
}

#[test]
fn check_rejects_non_json_file() {
    let file = payload_file("name = \"not json\"");
    stages()
        .args(["check", "--file"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a JSON stage payload"));
}

#[test]
fn check_missing_file_fails() {
    stages()
        .args(["check", "--file", "/nonexistent/stage.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

// --- With database ---

#[test]
fn show_missing_stage_fails() {
    if !common::has_test_db() {
        eprintln!("Skipping: TEST_DATABASE_URL not set");
        return;
    }
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(common::setup_test_db());

    stages()
        .env("DATABASE_URL", common::test_db_url())
        .args(["show", "--id", "999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
