//! # Main: CLI Entry Point
//!
//! Routes CLI subcommands to the HTTP server and to one-off stage operations.
//!
//! ## Subcommands
//!
//! - `serve`: run the HTTP API (PostgreSQL, or an in-memory store with
//!   `--in-memory`).
//! - `check`: validate a create payload from a JSON file and print the stage
//!   that would be stored. Needs no database.
//! - `list`, `show`, `delete`: direct stage operations against PostgreSQL.
//!
//! ## Global Options
//!
//! - `--database-url` / `DATABASE_URL`: PostgreSQL connection.
//! - `--patch-duration-basis` / `PATCH_DURATION_BASIS`: which dates a patch
//!   recalculates duration from (`patch` or `merged`).
//!
//! Logging goes through `tracing`; set `LOG_FORMAT=json` for JSON lines and
//! `RUST_LOG` to filter.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use construction_stages::service::DurationBasis;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "construction-stages",
    about = "Manage construction stage records"
)]
struct Cli {
    /// PostgreSQL connection URL (or set DATABASE_URL env var)
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Dates used to recalculate duration on patch: only those in the patch, or stored dates merged with it
    #[arg(long, env = "PATCH_DURATION_BASIS", value_enum, default_value_t = DurationBasis::Patch, global = true)]
    patch_duration_basis: DurationBasis,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the construction stage HTTP API
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Keep stages in memory instead of PostgreSQL (data is lost on exit)
        #[arg(long)]
        in_memory: bool,
    },
    /// Validate a create payload and print the stage that would be stored
    Check {
        /// Path to a JSON file holding one stage payload
        #[arg(long)]
        file: PathBuf,
    },
    /// List all stages
    List,
    /// Show one stage
    Show {
        /// Stage id
        #[arg(long)]
        id: i64,
    },
    /// Soft-delete a stage (status becomes DELETED)
    Delete {
        /// Stage id
        #[arg(long)]
        id: i64,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // LOG_FORMAT=json for log shippers, human-readable otherwise
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Check { file } => cli::run_check(file),
        Commands::Serve { port, in_memory } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::run_serve(&cli, *port, *in_memory))
        }
        Commands::List => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::run_list(&cli))
        }
        Commands::Show { id } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::run_show(&cli, *id))
        }
        Commands::Delete { id } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::run_delete(&cli, *id))
        }
    }
}
