//! Daily file continuity checking.
//!
//! Given a remote directory listing, identify the canonical daily marker
//! files, take the newest one, and walk the calendar from the day after it
//! up to "today" in the reference timezone. Every date in that walk is a
//! missing broadcast day.
//!
//! The timestamp embedded in the filename (`BXF<YYYYMMDDTHHMMSS>...`) is
//! authoritative, not the listing's own modification time: it survives clock
//! skew and transfer re-timestamping on the remote host, and it is identical
//! across FTP and SFTP listings, which report mtimes differently and at
//! coarser-than-second granularity.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::config::ContinuityConfig;
use crate::models::{ContinuityOutcome, GapReport, RawListingEntry, RemoteFileEntry};

/// Character range of the embedded timestamp: `BXF` + `YYYYMMDDTHHMMSS`.
const TIMESTAMP_RANGE: std::ops::Range<usize> = 3..18;
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";
/// How many raw filenames a `NoFilesFound` outcome carries for diagnosis.
const DIAGNOSTIC_SAMPLE: usize = 5;

/// Parse the broadcast timestamp embedded at fixed offsets in a marker
/// filename. `None` when the filename is too short or the slice does not
/// parse.
pub fn parse_marker_timestamp(filename: &str) -> Option<NaiveDateTime> {
    let raw = filename.get(TIMESTAMP_RANGE)?;
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
}

/// Whether a listing row names a canonical daily marker file.
pub fn is_daily_marker(filename: &str, config: &ContinuityConfig) -> bool {
    filename.starts_with(&config.file_prefix)
        && filename.ends_with(".xml")
        && filename.contains(&config.daily_token)
        && config.markers.iter().all(|m| filename.contains(m))
}

/// Run one continuity check over a raw listing.
///
/// `now_utc` is injected so the calendar walk is testable; callers pass
/// `Utc::now()`.
pub fn check_continuity(
    entries: &[RawListingEntry],
    config: &ContinuityConfig,
    tz: Tz,
    now_utc: DateTime<Utc>,
) -> ContinuityOutcome {
    let mut candidates: Vec<RemoteFileEntry> = Vec::new();
    for entry in entries {
        if !is_daily_marker(&entry.filename, config) {
            continue;
        }
        match parse_marker_timestamp(&entry.filename) {
            Some(timestamp) => candidates.push(RemoteFileEntry {
                filename: entry.filename.clone(),
                size: entry.size,
                timestamp,
            }),
            None => {
                warn!(
                    filename = %entry.filename,
                    "daily marker filename has no parseable timestamp; dropping"
                );
            }
        }
    }

    if candidates.is_empty() {
        return ContinuityOutcome::NoFilesFound {
            sampled_filenames: entries
                .iter()
                .take(DIAGNOSTIC_SAMPLE)
                .map(|e| e.filename.clone())
                .collect(),
        };
    }

    candidates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let latest_file = candidates.remove(0);
    let latest_file_date = latest_file.timestamp.date();

    let current_time = now_utc.with_timezone(&tz);
    let today = current_time.date_naive();

    // Every calendar day after the latest file, through today, is missing.
    // When the latest file is from today the walk is empty.
    let mut missing_dates = Vec::new();
    let mut day = latest_file_date + Duration::days(1);
    while day <= today {
        missing_dates.push(day);
        day = day + Duration::days(1);
    }

    let days_behind = missing_dates.len();
    ContinuityOutcome::Report(GapReport {
        latest_file,
        latest_file_date,
        current_time,
        is_current: days_behind == 0,
        days_behind,
        missing_dates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn config() -> ContinuityConfig {
        ContinuityConfig::default()
    }

    fn entry(filename: &str) -> RawListingEntry {
        RawListingEntry {
            filename: filename.to_string(),
            size: 1024,
        }
    }

    fn marker(date: &str) -> String {
        // e.g. BXF20241108T045959_KTOO_AsRun.xml
        format!("BXF{date}T045959_KTOO_AsRun.xml")
    }

    fn anchorage_now(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        chrono_tz::America::Anchorage
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn timestamp_is_parsed_from_fixed_offsets() {
        let ts = parse_marker_timestamp("BXF20241110T045959_KTOO_AsRun.xml").unwrap();
        assert_eq!(
            ts,
            NaiveDate::from_ymd_opt(2024, 11, 10)
                .unwrap()
                .and_hms_opt(4, 59, 59)
                .unwrap()
        );
        assert!(parse_marker_timestamp("BXF2024").is_none());
        assert!(parse_marker_timestamp("BXF2024111OT045959_x.xml").is_none());
    }

    #[test]
    fn marker_filter_requires_all_tokens() {
        let cfg = config();
        assert!(is_daily_marker("BXF20241110T045959_KTOO_AsRun.xml", &cfg));
        // Hourly instance, wrong time-of-day token.
        assert!(!is_daily_marker("BXF20241110T115959_KTOO_AsRun.xml", &cfg));
        // Missing station marker.
        assert!(!is_daily_marker("BXF20241110T045959_AsRun.xml", &cfg));
        // Wrong extension.
        assert!(!is_daily_marker("BXF20241110T045959_KTOO_AsRun.tmp", &cfg));
        // Wrong prefix.
        assert!(!is_daily_marker("XXX20241110T045959_KTOO_AsRun.xml", &cfg));
    }

    #[test]
    fn three_days_behind() {
        let entries = vec![
            entry(&marker("20241107")),
            entry(&marker("20241108")),
            entry("README.txt"),
        ];
        let now = anchorage_now(2024, 11, 11, 9);
        let outcome = check_continuity(
            &entries,
            &config(),
            chrono_tz::America::Anchorage,
            now,
        );

        let report = match outcome {
            ContinuityOutcome::Report(r) => r,
            other => panic!("expected a report, got {:?}", other),
        };
        assert_eq!(report.latest_file_date, NaiveDate::from_ymd_opt(2024, 11, 8).unwrap());
        assert_eq!(
            report.missing_dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 11, 9).unwrap(),
                NaiveDate::from_ymd_opt(2024, 11, 10).unwrap(),
                NaiveDate::from_ymd_opt(2024, 11, 11).unwrap(),
            ]
        );
        assert_eq!(report.days_behind, 3);
        assert!(!report.is_current);
    }

    #[test]
    fn current_when_latest_file_is_today() {
        let entries = vec![entry(&marker("20241111"))];
        let now = anchorage_now(2024, 11, 11, 9);
        let outcome = check_continuity(
            &entries,
            &config(),
            chrono_tz::America::Anchorage,
            now,
        );

        let report = match outcome {
            ContinuityOutcome::Report(r) => r,
            other => panic!("expected a report, got {:?}", other),
        };
        assert!(report.missing_dates.is_empty());
        assert_eq!(report.days_behind, 0);
        assert!(report.is_current);
    }

    #[test]
    fn today_is_computed_in_the_reference_zone() {
        // 06:00 UTC on Nov 12 is still Nov 11 in Anchorage; a file dated
        // Nov 11 is therefore current.
        let entries = vec![entry(&marker("20241111"))];
        let now = Utc.with_ymd_and_hms(2024, 11, 12, 6, 0, 0).unwrap();
        let outcome = check_continuity(
            &entries,
            &config(),
            chrono_tz::America::Anchorage,
            now,
        );
        match outcome {
            ContinuityOutcome::Report(r) => assert!(r.is_current),
            other => panic!("expected a report, got {:?}", other),
        }
    }

    #[test]
    fn empty_listing_reports_no_files_found() {
        let outcome =
            check_continuity(&[], &config(), chrono_tz::America::Anchorage, Utc::now());
        match outcome {
            ContinuityOutcome::NoFilesFound { sampled_filenames } => {
                assert!(sampled_filenames.is_empty())
            }
            other => panic!("expected NoFilesFound, got {:?}", other),
        }
    }

    #[test]
    fn unparseable_candidates_are_dropped_not_fatal() {
        // Marker-shaped name whose timestamp slice is garbage.
        let entries = vec![
            entry("BXFBADBADBADBADB_KTOO_AsRun_T045959.xml"),
            entry(&marker("20241110")),
        ];
        let now = anchorage_now(2024, 11, 10, 9);
        let outcome = check_continuity(
            &entries,
            &config(),
            chrono_tz::America::Anchorage,
            now,
        );
        match outcome {
            ContinuityOutcome::Report(r) => {
                assert_eq!(r.latest_file.filename, marker("20241110"));
            }
            other => panic!("expected a report, got {:?}", other),
        }
    }

    #[test]
    fn only_entries_with_no_survivors_sample_raw_names() {
        let entries = vec![entry("BXFJUNKJUNKJUNKJ_KTOO_AsRun_T045959.xml")];
        let outcome =
            check_continuity(&entries, &config(), chrono_tz::America::Anchorage, Utc::now());
        match outcome {
            ContinuityOutcome::NoFilesFound { sampled_filenames } => {
                assert_eq!(sampled_filenames.len(), 1)
            }
            other => panic!("expected NoFilesFound, got {:?}", other),
        }
    }
}
