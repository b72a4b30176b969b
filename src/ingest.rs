//! Idempotent ingestion of extracted as-run events.
//!
//! A document is ingested at most once, keyed by filename; events are
//! deduplicated store-wide by their (event_id, start_time) identity, because
//! the same event legitimately reappears across overlapping file deliveries.
//! The insert itself is the existence check: a uniqueness conflict means
//! "already exists" and the candidate is discarded, so there is no
//! read-then-write race for concurrent ingestions to fall into.
//!
//! One transaction per file: either the file row and all of its new events
//! become visible together, or none of them do.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::extract;
use crate::models::{BroadcastLogFile, IngestReport, IngestStatus, PlayoutEvent};

const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse one raw as-run document and ingest it.
///
/// The filename check happens before parsing, so re-delivery of an
/// already-ingested file never re-parses (or re-fails) its content.
pub async fn ingest_document(pool: &SqlitePool, filename: &str, xml: &str) -> Result<IngestReport> {
    if let Some(report) = skip_if_ingested(pool, filename, xml).await? {
        return Ok(report);
    }
    let events = extract::extract_events(xml)
        .with_context(|| format!("failed to parse as-run document {}", filename))?;
    ingest_events(pool, filename, content_digest(xml), &events).await
}

/// Ingest already-extracted events under the given file identity.
pub async fn ingest_events(
    pool: &SqlitePool,
    filename: &str,
    content_sha256: String,
    events: &[PlayoutEvent],
) -> Result<IngestReport> {
    // Re-check inside this call too: ingest_events is public API.
    if let Some(prior) = find_file_by_name(pool, filename).await? {
        return skipped_report(pool, prior, Some(&content_sha256)).await;
    }

    let ingested_at = Utc::now();
    let broadcast_date = events
        .iter()
        .find_map(|e| e.start_time)
        .map(|t| t.date())
        .unwrap_or_else(|| ingested_at.date_naive());

    let file_id = Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;

    // A concurrent ingestion of the same filename may have won the race
    // since the check above; the unique constraint settles it.
    let inserted = sqlx::query(
        r#"
        INSERT INTO asrun_files (id, filename, ingested_at, broadcast_date, content_sha256)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(filename) DO NOTHING
        "#,
    )
    .bind(&file_id)
    .bind(filename)
    .bind(ingested_at.timestamp())
    .bind(broadcast_date.format(DATE_FORMAT).to_string())
    .bind(&content_sha256)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        drop(tx);
        let prior = find_file_by_name(pool, filename)
            .await?
            .context("file vanished between conflict and lookup")?;
        return skipped_report(pool, prior, Some(&content_sha256)).await;
    }

    let mut new_events = 0u64;
    let mut skipped_events = 0u64;

    for event in events {
        let result = sqlx::query(
            r#"
            INSERT INTO playout_events (
                id, file_id, event_id, start_time, duration, title, category,
                description, spot_type, spot_type_category, start_mode,
                start_mode_category, end_mode, end_mode_category, status,
                event_type, house_number, source, segment_number, segment_name,
                program_name, non_program_name
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(event_id, start_time) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&file_id)
        .bind(&event.event_id)
        .bind(
            event
                .start_time
                .map(|t| t.format(START_TIME_FORMAT).to_string()),
        )
        .bind(&event.duration)
        .bind(&event.title)
        .bind(event.category.map(|c| c.as_str()))
        .bind(&event.description)
        .bind(&event.spot_type)
        .bind(event.spot_type_category.map(|c| c.as_str()))
        .bind(&event.start_mode)
        .bind(event.start_mode_category.map(|c| c.as_str()))
        .bind(&event.end_mode)
        .bind(event.end_mode_category.map(|c| c.as_str()))
        .bind(&event.status)
        .bind(&event.event_type)
        .bind(&event.house_number)
        .bind(&event.source)
        .bind(&event.segment_number)
        .bind(&event.segment_name)
        .bind(&event.program_name)
        .bind(&event.non_program_name)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            skipped_events += 1;
        } else {
            new_events += 1;
        }
    }

    tx.commit().await?;

    info!(
        filename,
        new_events, skipped_events, "ingested as-run file"
    );

    Ok(IngestReport {
        status: IngestStatus::Ingested,
        file_id,
        filename: filename.to_string(),
        ingested_at,
        new_events,
        skipped_events,
        stored_events: new_events as i64,
    })
}

fn content_digest(xml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(xml.as_bytes());
    hex::encode(hasher.finalize())
}

async fn skip_if_ingested(
    pool: &SqlitePool,
    filename: &str,
    xml: &str,
) -> Result<Option<IngestReport>> {
    match find_file_by_name(pool, filename).await? {
        Some(prior) => {
            let digest = content_digest(xml);
            Ok(Some(skipped_report(pool, prior, Some(&digest)).await?))
        }
        None => Ok(None),
    }
}

async fn skipped_report(
    pool: &SqlitePool,
    prior: BroadcastLogFile,
    incoming_sha256: Option<&str>,
) -> Result<IngestReport> {
    if let Some(digest) = incoming_sha256 {
        if digest != prior.content_sha256 {
            warn!(
                filename = %prior.filename,
                "re-delivered file has different content than the ingested copy; keeping the original"
            );
        } else {
            info!(filename = %prior.filename, "file already ingested; skipping");
        }
    }
    let stored_events = count_events_for_file(pool, &prior.id).await?;
    Ok(IngestReport {
        status: IngestStatus::Skipped,
        file_id: prior.id,
        filename: prior.filename,
        ingested_at: prior.ingested_at,
        new_events: 0,
        skipped_events: 0,
        stored_events,
    })
}

pub async fn find_file_by_name(
    pool: &SqlitePool,
    filename: &str,
) -> Result<Option<BroadcastLogFile>> {
    use sqlx::Row;

    let row = sqlx::query(
        "SELECT id, filename, ingested_at, broadcast_date, content_sha256 FROM asrun_files WHERE filename = ?",
    )
    .bind(filename)
    .fetch_optional(pool)
    .await?;

    let row = match row {
        Some(r) => r,
        None => return Ok(None),
    };

    let ingested_at: i64 = row.get("ingested_at");
    let broadcast_date: String = row.get("broadcast_date");

    Ok(Some(BroadcastLogFile {
        id: row.get("id"),
        filename: row.get("filename"),
        ingested_at: DateTime::<Utc>::from_timestamp(ingested_at, 0)
            .unwrap_or_else(Utc::now),
        broadcast_date: NaiveDate::parse_from_str(&broadcast_date, DATE_FORMAT)
            .unwrap_or_else(|_| Utc::now().date_naive()),
        content_sha256: row.get("content_sha256"),
    }))
}

pub async fn count_events_for_file(pool: &SqlitePool, file_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM playout_events WHERE file_id = ?")
        .bind(file_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
