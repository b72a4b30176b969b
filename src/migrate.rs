use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the schema. Idempotent; both identity keys are enforced here so
/// concurrent ingestions fall back on the store's uniqueness guarantees.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS asrun_files (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL UNIQUE,
            ingested_at INTEGER NOT NULL,
            broadcast_date TEXT NOT NULL,
            content_sha256 TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playout_events (
            id TEXT PRIMARY KEY,
            file_id TEXT NOT NULL,
            event_id TEXT,
            start_time TEXT,
            duration TEXT,
            title TEXT,
            category TEXT,
            description TEXT,
            spot_type TEXT,
            spot_type_category TEXT,
            start_mode TEXT,
            start_mode_category TEXT,
            end_mode TEXT,
            end_mode_category TEXT,
            status TEXT,
            event_type TEXT,
            house_number TEXT,
            source TEXT,
            segment_number TEXT,
            segment_name TEXT,
            program_name TEXT,
            non_program_name TEXT,
            UNIQUE(event_id, start_time),
            FOREIGN KEY (file_id) REFERENCES asrun_files(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_playout_events_file_id ON playout_events(file_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_playout_events_start_time ON playout_events(start_time)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_asrun_files_ingested_at ON asrun_files(ingested_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
