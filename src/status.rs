//! Store statistics and the status report.

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::models::StoreStats;

pub async fn collect_stats(pool: &SqlitePool) -> Result<StoreStats> {
    let total_files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM asrun_files")
        .fetch_one(pool)
        .await?;

    let total_events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM playout_events")
        .fetch_one(pool)
        .await?;

    let cutoff = (Utc::now() - Duration::hours(24)).timestamp();
    let files_last_24h: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM asrun_files WHERE ingested_at >= ?")
            .bind(cutoff)
            .fetch_one(pool)
            .await?;

    let latest: Option<String> =
        sqlx::query_scalar("SELECT MAX(broadcast_date) FROM asrun_files")
            .fetch_one(pool)
            .await?;
    let latest_broadcast_date =
        latest.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());

    Ok(StoreStats {
        total_files,
        total_events,
        files_last_24h,
        latest_broadcast_date,
    })
}

/// Run the status command: query the database and print a summary.
pub async fn run_status(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let stats = collect_stats(&pool).await?;
    pool.close().await;

    println!("AsRun Analyzer — Store Status");
    println!("=============================");
    println!();
    println!("  Database:            {}", config.db.path.display());
    println!("  Files ingested:      {}", stats.total_files);
    println!("  Playout events:      {}", stats.total_events);
    println!("  Files last 24h:      {}", stats.files_last_24h);
    match stats.latest_broadcast_date {
        Some(date) => println!("  Latest broadcast:    {}", date),
        None => println!("  Latest broadcast:    (none)"),
    }

    Ok(())
}
