//! Alerting seam for continuity gaps and status reports.
//!
//! Delivery mechanics (SMTP, chat webhooks) live behind the [`Notifier`]
//! trait; the poll cycle treats every notifier as fire-and-forget and a
//! delivery failure is logged, never escalated into failing the cycle.
//!
//! [`LogNotifier`] is the in-tree implementation: it emits the same fields
//! the operator-facing e-mail carries as structured tracing events, which is
//! enough for deployments that scrape logs.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::{GapReport, StoreStats};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Alert that daily files are missing.
    async fn send_gap_alert(&self, report: &GapReport) -> Result<()>;

    /// Periodic system status summary.
    async fn send_status_report(&self, stats: &StoreStats) -> Result<()>;
}

/// Notifier that writes alerts to the log stream.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_gap_alert(&self, report: &GapReport) -> Result<()> {
        let missing: Vec<String> = report
            .missing_dates
            .iter()
            .map(|d| d.to_string())
            .collect();
        warn!(
            days_behind = report.days_behind,
            current_time = %report.current_time,
            latest_file = %report.latest_file.filename,
            latest_file_date = %report.latest_file_date,
            latest_file_size = report.latest_file.size,
            missing_dates = ?missing,
            "as-run file alert: {} day(s) behind",
            report.days_behind
        );
        Ok(())
    }

    async fn send_status_report(&self, stats: &StoreStats) -> Result<()> {
        info!(
            total_files = stats.total_files,
            total_events = stats.total_events,
            files_last_24h = stats.files_last_24h,
            latest_broadcast_date = ?stats.latest_broadcast_date,
            "as-run system status"
        );
        Ok(())
    }
}
