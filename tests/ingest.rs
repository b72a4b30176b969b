//! End-to-end ingestion tests against a temporary SQLite database.

mod common;

use asrun_analyzer::{db, ingest, migrate};
use asrun_analyzer::models::IngestStatus;
use common::{bxf_document, bxf_document_with_events, test_config};

async fn setup() -> (tempfile::TempDir, sqlx::SqlitePool) {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = test_config(tmp.path());
    let pool = db::connect(&cfg).await.unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    (tmp, pool)
}

async fn total_events(pool: &sqlx::SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM playout_events")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn ingesting_the_same_file_twice_is_a_no_op() {
    let (_tmp, pool) = setup().await;
    let xml = bxf_document_with_events(
        "2024-11-10",
        &[
            ("EVT-1", "05:00:00;00"),
            ("EVT-2", "05:30:00;00"),
            ("EVT-3", "06:00:00;00"),
        ],
    );

    let first = ingest::ingest_document(&pool, "BXF20241110T045959_KTOO_AsRun.xml", &xml)
        .await
        .unwrap();
    assert_eq!(first.status, IngestStatus::Ingested);
    assert_eq!(first.new_events, 3);
    assert_eq!(first.skipped_events, 0);
    assert_eq!(total_events(&pool).await, 3);

    let second = ingest::ingest_document(&pool, "BXF20241110T045959_KTOO_AsRun.xml", &xml)
        .await
        .unwrap();
    assert_eq!(second.status, IngestStatus::Skipped);
    assert_eq!(second.new_events, 0);
    assert_eq!(second.stored_events, 3);
    assert_eq!(second.file_id, first.file_id);
    assert_eq!(total_events(&pool).await, 3);
}

#[tokio::test]
async fn overlapping_deliveries_deduplicate_by_event_identity() {
    let (_tmp, pool) = setup().await;

    let morning = bxf_document_with_events(
        "2024-11-10",
        &[
            ("EVT-1", "05:00:00;00"),
            ("EVT-2", "05:30:00;00"),
            ("EVT-3", "06:00:00;00"),
        ],
    );
    let evening = bxf_document_with_events(
        "2024-11-10",
        &[
            ("EVT-2", "05:30:00;00"),
            ("EVT-3", "06:00:00;00"),
            ("EVT-4", "22:00:00;00"),
        ],
    );

    ingest::ingest_document(&pool, "BXF20241110T115959_KTOO_AsRun.xml", &morning)
        .await
        .unwrap();
    let report = ingest::ingest_document(&pool, "BXF20241110T045959_KTOO_AsRun.xml", &evening)
        .await
        .unwrap();

    assert_eq!(report.status, IngestStatus::Ingested);
    assert_eq!(report.new_events, 1);
    assert_eq!(report.skipped_events, 2);
    assert_eq!(total_events(&pool).await, 4);

    // No two stored rows may share the (event_id, start_time) identity.
    let duplicate_identities: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM (
            SELECT event_id, start_time FROM playout_events
            GROUP BY event_id, start_time HAVING COUNT(*) > 1
        )
        "#,
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(duplicate_identities, 0);
}

#[tokio::test]
async fn same_event_id_at_different_times_is_a_different_event() {
    let (_tmp, pool) = setup().await;

    // The same spot aired twice: one event id, two start times.
    let xml = bxf_document_with_events(
        "2024-11-10",
        &[("EVT-1", "05:00:00;00"), ("EVT-1", "09:00:00;00")],
    );
    let report = ingest::ingest_document(&pool, "BXF20241110T045959_KTOO_AsRun.xml", &xml)
        .await
        .unwrap();
    assert_eq!(report.new_events, 2);
}

#[tokio::test]
async fn zero_event_file_is_a_valid_ingestion() {
    let (_tmp, pool) = setup().await;

    let report = ingest::ingest_document(
        &pool,
        "BXF20241110T045959_KTOO_AsRun.xml",
        &bxf_document(""),
    )
    .await
    .unwrap();
    assert_eq!(report.status, IngestStatus::Ingested);
    assert_eq!(report.new_events, 0);

    let files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM asrun_files")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(files, 1);
}

#[tokio::test]
async fn malformed_document_writes_nothing() {
    let (_tmp, pool) = setup().await;

    let err = ingest::ingest_document(
        &pool,
        "BXF20241110T045959_KTOO_AsRun.xml",
        "<bxf:AsRun><bxf:CompleteAsRun></bxf:AsRun>",
    )
    .await
    .unwrap_err();
    assert!(format!("{:#}", err).contains("malformed XML"));

    let files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM asrun_files")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(files, 0);
    assert_eq!(total_events(&pool).await, 0);
}

#[tokio::test]
async fn broadcast_date_comes_from_the_first_event() {
    let (_tmp, pool) = setup().await;

    let xml = bxf_document_with_events("2024-11-10", &[("EVT-1", "05:00:00;00")]);
    ingest::ingest_document(&pool, "BXF20241110T045959_KTOO_AsRun.xml", &xml)
        .await
        .unwrap();

    let stored: String =
        sqlx::query_scalar("SELECT broadcast_date FROM asrun_files LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stored, "2024-11-10");
}
