//! Cron-style trigger for the poll cycle.
//!
//! One scheduler instance owns exactly one named job. `start()` and `stop()`
//! are idempotent; the next fire time is queryable while running. The job
//! body holds a run-lock so a slow cycle delays the next one instead of
//! stacking on top of it, and a failed cycle is logged and absorbed — there
//! is always a next fire, and ingestion idempotence makes the implicit retry
//! safe.
//!
//! Two operating modes, one active per instance:
//!
//! - `daily` (primary): fire at a fixed wall-clock time in the reference
//!   timezone, shortly after the expected daily file's arrival, running the
//!   gap check.
//! - `hourly`: fire on the hour, running the bulk pull.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::poll::{self, PollContext};

const JOB_NAME: &str = "process_asrun_files";

/// Which cycle body the job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    Daily,
    Hourly,
}

struct RunningJob {
    sched: JobScheduler,
    job_id: Uuid,
}

pub struct PollScheduler {
    ctx: Arc<PollContext>,
    mode: PollMode,
    inner: tokio::sync::Mutex<Option<RunningJob>>,
    run_lock: Arc<tokio::sync::Mutex<()>>,
}

impl PollScheduler {
    pub fn new(ctx: Arc<PollContext>) -> Self {
        let mode = match ctx.config.scheduler.mode.as_str() {
            "hourly" => PollMode::Hourly,
            _ => PollMode::Daily,
        };
        Self {
            ctx,
            mode,
            inner: tokio::sync::Mutex::new(None),
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn mode(&self) -> PollMode {
        self.mode
    }

    /// Start the scheduler. A no-op when already running.
    pub async fn start(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.is_some() {
            info!(job = JOB_NAME, "scheduler already running");
            return Ok(());
        }

        let sched = JobScheduler::new().await?;
        let job = self.build_job()?;
        let job_id = sched.add(job).await?;
        sched.start().await?;

        info!(job = JOB_NAME, mode = ?self.mode, "scheduler started");
        *guard = Some(RunningJob { sched, job_id });
        Ok(())
    }

    /// Stop the scheduler. A no-op when already stopped.
    pub async fn stop(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        match guard.take() {
            Some(mut running) => {
                running.sched.shutdown().await?;
                info!(job = JOB_NAME, "scheduler stopped");
            }
            None => info!(job = JOB_NAME, "scheduler already stopped"),
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Next fire time of the job, when running.
    pub async fn next_run(&self) -> Result<Option<DateTime<Utc>>> {
        let mut guard = self.inner.lock().await;
        match guard.as_mut() {
            Some(running) => {
                let job_id = running.job_id;
                Ok(running.sched.next_tick_for_job(job_id).await?)
            }
            None => Ok(None),
        }
    }

    fn build_job(&self) -> Result<Job> {
        let ctx = self.ctx.clone();
        let run_lock = self.run_lock.clone();
        let mode = self.mode;

        let body = move |_uuid, _sched| {
            let ctx = ctx.clone();
            let run_lock = run_lock.clone();
            Box::pin(async move {
                run_cycle_guarded(mode, ctx, run_lock).await;
            }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
        };

        let job = match self.mode {
            PollMode::Hourly => Job::new_async("0 0 * * * *", body)?,
            PollMode::Daily => {
                use chrono::Timelike;
                let fire = self.ctx.config.scheduler.daily_fire_time();
                let expr = format!("0 {} {} * * *", fire.minute(), fire.hour());
                Job::new_async_tz(
                    expr.as_str(),
                    self.ctx.config.continuity.reference_tz(),
                    body,
                )?
            }
        };
        Ok(job)
    }
}

async fn run_cycle_guarded(
    mode: PollMode,
    ctx: Arc<PollContext>,
    run_lock: Arc<tokio::sync::Mutex<()>>,
) {
    // Non-overlapping runs: if the previous cycle is still going, skip this
    // fire entirely rather than queueing behind it.
    let _guard = match run_lock.try_lock() {
        Ok(g) => g,
        Err(_) => {
            warn!(job = JOB_NAME, "previous poll cycle still running; skipping this fire");
            return;
        }
    };

    info!(job = JOB_NAME, mode = ?mode, "poll cycle starting");
    let result = match mode {
        PollMode::Daily => poll::run_gap_check(&ctx).await.map(|_| ()),
        PollMode::Hourly => poll::run_bulk_pull(&ctx).await.map(|_| ()),
    };

    match result {
        Ok(()) => info!(job = JOB_NAME, "poll cycle complete"),
        Err(e) => {
            // Never take the scheduler down; the next fire is the retry.
            error!(job = JOB_NAME, error = ?e, "poll cycle failed; will retry at next fire");
        }
    }
}
