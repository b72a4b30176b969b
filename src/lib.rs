//! # AsRun Analyzer
//!
//! Ingestion and continuity monitoring for broadcast as-run logs.
//!
//! A traffic/automation system drops BXF/PMCP-style XML documents describing
//! what actually aired. This crate turns those documents into structured
//! playout events, persists them idempotently, and keeps watch that a new
//! daily log keeps arriving from the remote drop directory.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────┐
//! │ RemoteSource │──▶│  Extract      │──▶│  SQLite   │
//! │ (drop dir)   │   │ Vocab+Timecode│   │ dedup'd   │
//! └──────┬───────┘   └───────────────┘   └────┬─────┘
//!        │                                    │
//!   ┌────▼─────┐       ┌──────────┐      ┌────▼─────┐
//!   │Continuity│──────▶│ Notifier │      │ CLI/HTTP │
//!   │ Monitor  │  gap  │ +Traffic │      │ (asrun)  │
//!   └──────────┘       └──────────┘      └──────────┘
//! ```
//!
//! The poll scheduler fires the continuity monitor (daily mode) or a bulk
//! pull (hourly mode) against the remote source; independently, documents
//! reaching the ingest path flow through extraction into the store. Event
//! identity is `(event_id, start_time)` across all files, so overlapping
//! deliveries never duplicate data and re-ingestion is always safe.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`vocab`] | Controlled vocabularies with UNKNOWN fallback |
//! | [`timecode`] | SMPTE date+timecode resolution |
//! | [`extract`] | XML to playout events, per-record isolation |
//! | [`ingest`] | Idempotent persistence |
//! | [`continuity`] | Missing-day detection |
//! | [`transport`] | Remote source trait + local drop directory |
//! | [`notify`] | Gap/status alert seam |
//! | [`traffic`] | Remote remediation seam |
//! | [`poll`] | One poll cycle |
//! | [`scheduler`] | Cron-style trigger |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`status`] | Store statistics |

pub mod config;
pub mod continuity;
pub mod db;
pub mod extract;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod notify;
pub mod poll;
pub mod scheduler;
pub mod server;
pub mod status;
pub mod timecode;
pub mod traffic;
pub mod transport;
pub mod vocab;
