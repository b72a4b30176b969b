use anyhow::{Context, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub continuity: ContinuityConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Remote file source settings.
///
/// `kind` selects the transport implementation; only `localdir` ships
/// in-tree (a mounted or rsynced drop directory). FTP/SFTP variants plug in
/// behind the same [`RemoteSource`](crate::transport::RemoteSource) trait.
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_kind")]
    pub kind: String,
    /// Directory to list/download from (for the `localdir` kind).
    #[serde(default = "default_remote_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    /// Where downloaded documents land before ingestion.
    #[serde(default = "default_spool")]
    pub spool: PathBuf,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            kind: default_remote_kind(),
            root: default_remote_root(),
            include_globs: default_include_globs(),
            spool: default_spool(),
        }
    }
}

fn default_remote_kind() -> String {
    "localdir".to_string()
}
fn default_remote_root() -> PathBuf {
    PathBuf::from("./data/remote")
}
fn default_include_globs() -> Vec<String> {
    vec!["BXF*.xml".to_string()]
}
fn default_spool() -> PathBuf {
    PathBuf::from("./data/spool")
}

/// Continuity monitor settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ContinuityConfig {
    /// IANA reference timezone "today" is computed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Daily marker filenames start with this prefix; the embedded
    /// `YYYYMMDDTHHMMSS` timestamp follows immediately after it.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Substrings a daily marker filename must contain.
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,
    /// Time-of-day token identifying the canonical daily file instance.
    #[serde(default = "default_daily_token")]
    pub daily_token: String,
    /// Invoke remediation once this many days are missing.
    #[serde(default = "default_restart_threshold")]
    pub restart_threshold_days: usize,
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            file_prefix: default_file_prefix(),
            markers: default_markers(),
            daily_token: default_daily_token(),
            restart_threshold_days: default_restart_threshold(),
        }
    }
}

fn default_timezone() -> String {
    "America/Anchorage".to_string()
}
fn default_file_prefix() -> String {
    "BXF".to_string()
}
fn default_markers() -> Vec<String> {
    vec!["KTOO".to_string(), "AsRun".to_string()]
}
fn default_daily_token() -> String {
    "T045959".to_string()
}
fn default_restart_threshold() -> usize {
    2
}

impl ContinuityConfig {
    pub fn reference_tz(&self) -> Tz {
        // Validated in load_config; the fallback only matters for configs
        // assembled in tests without going through the loader.
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}

/// Poll scheduler settings.
#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// `daily` (gap check at a fixed local time) or `hourly` (bulk pull on
    /// the hour). Exactly one mode is active per scheduler instance.
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Wall-clock fire time for `daily` mode, `HH:MM` in the reference zone.
    #[serde(default = "default_daily_time")]
    pub daily_time: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            daily_time: default_daily_time(),
        }
    }
}

fn default_mode() -> String {
    "daily".to_string()
}
fn default_daily_time() -> String {
    "06:30".to_string()
}

impl SchedulerConfig {
    pub fn daily_fire_time(&self) -> NaiveTime {
        NaiveTime::parse_from_str(&self.daily_time, "%H:%M")
            .unwrap_or_else(|_| NaiveTime::from_hms_opt(6, 30, 0).unwrap())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.continuity.timezone.parse::<Tz>().is_err() {
        anyhow::bail!(
            "continuity.timezone is not a valid IANA zone: '{}'",
            config.continuity.timezone
        );
    }

    if config.continuity.file_prefix.is_empty() {
        anyhow::bail!("continuity.file_prefix must not be empty");
    }

    if NaiveTime::parse_from_str(&config.scheduler.daily_time, "%H:%M").is_err() {
        anyhow::bail!(
            "scheduler.daily_time must be HH:MM, got '{}'",
            config.scheduler.daily_time
        );
    }

    match config.scheduler.mode.as_str() {
        "daily" | "hourly" => {}
        other => anyhow::bail!("Unknown scheduler mode: '{}'. Must be daily or hourly.", other),
    }

    match config.remote.kind.as_str() {
        "localdir" => {}
        other => anyhow::bail!(
            "Unknown remote source kind: '{}'. Available: localdir.",
            other
        ),
    }

    Ok(config)
}
