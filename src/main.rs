//! # AsRun Analyzer CLI (`asrun`)
//!
//! The `asrun` binary is the operational interface for the as-run pipeline:
//! database initialization, document ingestion, continuity checks, the poll
//! scheduler, and the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! asrun --config ./config/asrun.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `asrun init` | Create the SQLite database and schema |
//! | `asrun ingest <files...>` | Parse and ingest local as-run XML files |
//! | `asrun check` | Run one continuity check and print the report |
//! | `asrun watch` | Run the poll scheduler in the foreground |
//! | `asrun serve` | Start the HTTP server (scheduler included) |
//! | `asrun status` | Print store statistics |
//! | `asrun sources` | Show the remote source and its health |

mod config;
mod continuity;
mod db;
mod extract;
mod ingest;
mod migrate;
mod models;
mod notify;
mod poll;
mod scheduler;
mod server;
mod status;
mod timecode;
mod traffic;
mod transport;
mod vocab;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::models::{ContinuityOutcome, IngestStatus};
use crate::poll::PollContext;
use crate::scheduler::PollScheduler;

/// AsRun Analyzer — ingestion and continuity monitoring for broadcast
/// as-run logs.
#[derive(Parser)]
#[command(
    name = "asrun",
    about = "AsRun Analyzer — ingestion and continuity monitoring for broadcast as-run logs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/asrun.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and both tables with their unique
    /// constraints. Idempotent — running it multiple times is safe.
    Init,

    /// Parse and ingest local as-run XML files.
    ///
    /// Each file is one unit of work: a failure aborts only that file and
    /// the remaining files are still processed. Re-ingesting a filename the
    /// store already has is reported as skipped, never as an error.
    Ingest {
        /// Paths to as-run XML documents.
        files: Vec<PathBuf>,
    },

    /// Run one continuity check against the remote source and print the
    /// resulting report. Read-only: no alerting or remediation fires.
    Check,

    /// Run the poll scheduler in the foreground until interrupted.
    Watch,

    /// Start the HTTP server (the scheduler starts alongside it).
    Serve,

    /// Print store statistics.
    Status,

    /// Show the configured remote source and its health.
    Sources,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { files } => {
            run_ingest(&cfg, &files).await?;
        }
        Commands::Check => {
            run_check(&cfg).await?;
        }
        Commands::Watch => {
            run_watch(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
        Commands::Sources => {
            run_sources(&cfg)?;
        }
    }

    Ok(())
}

async fn run_ingest(cfg: &config::Config, files: &[PathBuf]) -> anyhow::Result<()> {
    if files.is_empty() {
        anyhow::bail!("no files given; usage: asrun ingest <files...>");
    }

    let pool = db::connect(cfg).await?;
    migrate::apply_schema(&pool).await?;

    let mut failed = 0usize;
    for path in files {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let outcome = async {
            let xml = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            ingest::ingest_document(&pool, &filename, &xml).await
        }
        .await;

        match outcome {
            Ok(report) => match report.status {
                IngestStatus::Ingested => println!(
                    "{}: ingested ({} new, {} duplicate)",
                    report.filename, report.new_events, report.skipped_events
                ),
                IngestStatus::Skipped => println!(
                    "{}: skipped (already ingested {}, {} events stored)",
                    report.filename,
                    report.ingested_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    report.stored_events
                ),
            },
            Err(e) => {
                failed += 1;
                eprintln!("Warning: {}: {:#}", path.display(), e);
            }
        }
    }

    pool.close().await;
    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed to ingest", failed, files.len());
    }
    println!("ok");
    Ok(())
}

async fn run_check(cfg: &config::Config) -> anyhow::Result<()> {
    let source = transport::source_from_config(&cfg.remote)?;
    let entries = source.list_directory().await?;
    let outcome = continuity::check_continuity(
        &entries,
        &cfg.continuity,
        cfg.continuity.reference_tz(),
        Utc::now(),
    );

    match outcome {
        ContinuityOutcome::Report(report) => {
            println!("Continuity check — reference zone {}", cfg.continuity.timezone);
            println!(
                "  latest file:  {} ({})",
                report.latest_file.filename, report.latest_file_date
            );
            println!("  now:          {}", report.current_time.format("%Y-%m-%d %H:%M %Z"));
            if report.is_current {
                println!("  status:       current");
            } else {
                let missing: Vec<String> =
                    report.missing_dates.iter().map(|d| d.to_string()).collect();
                println!("  missing:      {}", missing.join(", "));
                println!("  days behind:  {}", report.days_behind);
            }
        }
        ContinuityOutcome::NoFilesFound { sampled_filenames } => {
            println!("No daily marker files found in the remote listing.");
            if !sampled_filenames.is_empty() {
                println!("  sampled entries: {}", sampled_filenames.join(", "));
            }
        }
    }
    Ok(())
}

async fn run_watch(cfg: &config::Config) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    migrate::apply_schema(&pool).await?;

    let ctx = Arc::new(PollContext::from_config(Arc::new(cfg.clone()), pool)?);
    let scheduler = PollScheduler::new(ctx);
    scheduler.start().await?;

    if let Some(next) = scheduler.next_run().await? {
        println!("Scheduler running; next fire at {}", next.to_rfc3339());
    }
    println!("Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    scheduler.stop().await?;
    println!("Scheduler stopped.");
    Ok(())
}

fn run_sources(cfg: &config::Config) -> anyhow::Result<()> {
    let source = transport::source_from_config(&cfg.remote)?;
    println!("{:<12} {:<44} HEALTHY", "SOURCE", "DESCRIPTION");
    println!(
        "{:<12} {:<44} {}",
        source.name(),
        source.description(),
        source.healthy()
    );
    Ok(())
}
