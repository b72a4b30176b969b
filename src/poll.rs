//! One poll cycle against the remote file source.
//!
//! Two cycle bodies exist, matching the scheduler's two modes:
//!
//! - [`run_gap_check`]: list the drop directory, run the continuity monitor,
//!   and on a detected gap alert the notifier; past the configured threshold
//!   also ask for the traffic module to be restarted.
//! - [`run_bulk_pull`]: download every not-yet-ingested document and ingest
//!   it (the earlier hourly operating mode).
//!
//! Neither body is allowed to take the scheduler down: notifier failures are
//! logged and swallowed, per-file ingestion failures skip to the next file,
//! and transport failures abort only the current cycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::continuity;
use crate::ingest;
use crate::models::{ContinuityOutcome, IngestStatus};
use crate::notify::Notifier;
use crate::traffic::TrafficControl;
use crate::transport::RemoteSource;

/// Everything a scheduled cycle needs, shared across fires.
pub struct PollContext {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub source: Arc<dyn RemoteSource>,
    pub notifier: Arc<dyn Notifier>,
    pub traffic: Arc<dyn TrafficControl>,
}

impl PollContext {
    /// Wire up a context from configuration: the configured remote source,
    /// the log-backed notifier, and disabled remediation.
    pub fn from_config(config: Arc<Config>, pool: SqlitePool) -> Result<Self> {
        let source = crate::transport::source_from_config(&config.remote)?;
        Ok(Self {
            config,
            pool,
            source,
            notifier: Arc::new(crate::notify::LogNotifier),
            traffic: Arc::new(crate::traffic::DisabledTrafficControl),
        })
    }
}

/// Result of one bulk pull.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BulkReport {
    pub listed: usize,
    pub already_ingested: usize,
    pub ingested: usize,
    pub failed: usize,
    pub new_events: u64,
}

/// Daily continuity check with alerting and remediation.
pub async fn run_gap_check(ctx: &PollContext) -> Result<ContinuityOutcome> {
    let entries = ctx
        .source
        .list_directory()
        .await
        .context("remote listing failed; aborting poll cycle")?;

    let outcome = continuity::check_continuity(
        &entries,
        &ctx.config.continuity,
        ctx.config.continuity.reference_tz(),
        Utc::now(),
    );

    match &outcome {
        ContinuityOutcome::Report(report) if report.is_current => {
            info!(
                latest_file = %report.latest_file.filename,
                "daily as-run file is current"
            );
        }
        ContinuityOutcome::Report(report) => {
            warn!(days_behind = report.days_behind, "daily as-run file gap detected");
            if let Err(e) = ctx.notifier.send_gap_alert(report).await {
                warn!(error = %e, "gap alert delivery failed");
            }
            if report.days_behind >= ctx.config.continuity.restart_threshold_days {
                match ctx.traffic.restart_remote_service().await {
                    Ok(true) => info!("traffic module restart completed"),
                    Ok(false) => warn!("traffic module restart attempted and failed"),
                    Err(e) => error!(error = %e, "traffic module restart could not be attempted"),
                }
            }
        }
        ContinuityOutcome::NoFilesFound { sampled_filenames } => {
            warn!(
                sample = ?sampled_filenames,
                "no daily marker files found in remote listing"
            );
        }
    }

    Ok(outcome)
}

/// Hourly bulk pull: download and ingest everything new.
pub async fn run_bulk_pull(ctx: &PollContext) -> Result<BulkReport> {
    let entries = ctx
        .source
        .list_directory()
        .await
        .context("remote listing failed; aborting poll cycle")?;

    let mut report = BulkReport {
        listed: entries.len(),
        ..BulkReport::default()
    };

    for entry in &entries {
        if ingest::find_file_by_name(&ctx.pool, &entry.filename)
            .await?
            .is_some()
        {
            report.already_ingested += 1;
            continue;
        }

        match pull_and_ingest(ctx, &entry.filename).await {
            Ok(ingested) => {
                if ingested.status == IngestStatus::Ingested {
                    report.ingested += 1;
                    report.new_events += ingested.new_events;
                } else {
                    report.already_ingested += 1;
                }
            }
            Err(e) => {
                report.failed += 1;
                warn!(filename = %entry.filename, error = %e, "failed to pull file; continuing");
            }
        }
    }

    info!(
        listed = report.listed,
        ingested = report.ingested,
        already_ingested = report.already_ingested,
        failed = report.failed,
        new_events = report.new_events,
        "bulk pull complete"
    );

    Ok(report)
}

async fn pull_and_ingest(
    ctx: &PollContext,
    filename: &str,
) -> Result<crate::models::IngestReport> {
    let local = ctx
        .source
        .download(filename, &ctx.config.remote.spool)
        .await?;
    let xml = tokio::fs::read_to_string(&local)
        .await
        .with_context(|| format!("failed to read downloaded file {}", local.display()))?;
    ingest::ingest_document(&ctx.pool, filename, &xml).await
}
