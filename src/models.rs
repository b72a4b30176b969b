//! Core data models for the as-run pipeline.
//!
//! These types represent the files, playout events, and continuity reports
//! that flow through ingestion and monitoring.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::vocab::{EndMode, EventCategory, SpotType, StartMode};

/// One ingested as-run document, as stored.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastLogFile {
    pub id: String,
    pub filename: String,
    pub ingested_at: DateTime<Utc>,
    pub broadcast_date: NaiveDate,
    /// SHA-256 of the raw document body, hex-encoded. Used to tell identical
    /// re-delivery apart from a name collision with different content.
    pub content_sha256: String,
}

/// One broadcast occurrence extracted from an as-run document.
///
/// Every field except the classifier outputs comes straight from the XML;
/// absence of an optional element yields `None`, never an error. The pair
/// (`event_id`, `start_time`) is the identity of an event across all files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayoutEvent {
    pub event_id: Option<String>,
    pub title: Option<String>,
    pub category: Option<EventCategory>,
    pub description: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    /// Raw SMPTE duration timecode, stored verbatim.
    pub duration: Option<String>,
    pub spot_type: Option<String>,
    pub spot_type_category: Option<SpotType>,
    pub start_mode: Option<String>,
    pub start_mode_category: Option<StartMode>,
    pub end_mode: Option<String>,
    pub end_mode_category: Option<EndMode>,
    pub status: Option<String>,
    pub event_type: Option<String>,
    pub house_number: Option<String>,
    pub source: Option<String>,
    pub segment_number: Option<String>,
    pub segment_name: Option<String>,
    pub program_name: Option<String>,
    pub non_program_name: Option<String>,
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    /// The file was new; its events were persisted.
    Ingested,
    /// A file with this name was already in the store; nothing was written.
    Skipped,
}

/// Report returned by the ingestion engine.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub status: IngestStatus,
    pub file_id: String,
    pub filename: String,
    pub ingested_at: DateTime<Utc>,
    /// Events written by this call. Always 0 for a skipped file.
    pub new_events: u64,
    /// Candidates discarded because their (event_id, start_time) identity
    /// already existed.
    pub skipped_events: u64,
    /// Events attached to the file row after this call.
    pub stored_events: i64,
}

/// One row of a remote directory listing that parsed as a daily marker file.
///
/// Transient: lives for one poll cycle only. The `timestamp` comes from the
/// filename itself (`BXF<YYYYMMDDTHHMMSS>...`), not from the listing's
/// modification time.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteFileEntry {
    pub filename: String,
    pub size: u64,
    pub timestamp: NaiveDateTime,
}

/// Raw listing row as produced by a transport, before marker filtering.
#[derive(Debug, Clone)]
pub struct RawListingEntry {
    pub filename: String,
    pub size: u64,
}

/// Output of one continuity check.
#[derive(Debug, Clone, Serialize)]
pub struct GapReport {
    pub latest_file: RemoteFileEntry,
    pub latest_file_date: NaiveDate,
    /// "Now" converted into the reference timezone at check time.
    pub current_time: DateTime<chrono_tz::Tz>,
    /// Calendar dates with no corresponding daily file, ascending.
    pub missing_dates: Vec<NaiveDate>,
    pub days_behind: usize,
    pub is_current: bool,
}

/// Result of one continuity check, including the no-data case.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContinuityOutcome {
    Report(GapReport),
    /// No listing entry survived marker filtering and timestamp parsing.
    /// Carries a small sample of the raw filenames for diagnosis.
    NoFilesFound { sampled_filenames: Vec<String> },
}

/// Store-wide statistics for status reports.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_files: i64,
    pub total_events: i64,
    pub files_last_24h: i64,
    pub latest_broadcast_date: Option<NaiveDate>,
}
