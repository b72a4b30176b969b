//! SMPTE timecode resolution.
//!
//! As-run timing arrives as a broadcast date (`YYYY-MM-DD`, carried on the
//! `SmpteDateTime` element) plus an SMPTE timecode (`HH:MM:SS;FF`). The frame
//! component is truncated, not rounded: continuity and calendar math only
//! care about second resolution.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Failure to resolve a broadcast date + timecode pair.
///
/// Record-local: the extractor drops the offending record and continues with
/// the rest of the document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimecodeParseError {
    #[error("invalid broadcast date {0:?} (expected YYYY-MM-DD)")]
    BadDate(String),
    #[error("invalid SMPTE timecode {0:?} (expected HH:MM:SS[;FF])")]
    BadTimecode(String),
}

/// Resolve a broadcast date and SMPTE timecode into an absolute timestamp.
///
/// The optional `;FF` frame suffix is discarded.
///
/// ```
/// use asrun_analyzer::timecode::resolve_timecode;
/// let ts = resolve_timecode("2024-11-10", "05:59:59;29").unwrap();
/// assert_eq!(ts.to_string(), "2024-11-10 05:59:59");
/// ```
pub fn resolve_timecode(date: &str, timecode: &str) -> Result<NaiveDateTime, TimecodeParseError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| TimecodeParseError::BadDate(date.to_string()))?;

    // Strip the frame count before parsing.
    let hms = timecode.trim().split(';').next().unwrap_or_default();
    let time = NaiveTime::parse_from_str(hms, "%H:%M:%S")
        .map_err(|_| TimecodeParseError::BadTimecode(timecode.to_string()))?;

    Ok(date.and_time(time))
}
