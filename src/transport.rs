//! Remote file source abstraction.
//!
//! The poll cycle only needs two operations from its transport: list the
//! as-run drop directory and download one file. [`RemoteSource`] captures
//! exactly that, so FTP and SFTP variants are interchangeable behind it and
//! the core never sees protocol plumbing. Connect/disconnect lifecycles,
//! authentication, and socket timeouts belong to the implementations.
//!
//! The in-tree implementation is [`LocalDirSource`], which serves a mounted
//! or rsynced drop directory. Its listing is glob-filtered and sorted for
//! deterministic output.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::RemoteConfig;
use crate::models::RawListingEntry;

/// Transport failure. Aborts the current poll cycle; the next scheduled
/// cycle proceeds normally.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("remote source misconfigured: {0}")]
    Config(String),
    #[error("failed to list {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to download {filename}: {source}")]
    Download {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

/// A source of as-run documents.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Short identifier used in logs and the `sources` listing.
    fn name(&self) -> &str;

    /// One-line description of where this source reads from.
    fn description(&self) -> String;

    /// Whether the source is reachable with the current configuration.
    fn healthy(&self) -> bool;

    /// List the drop directory. Blocking I/O inside implementations must not
    /// block the caller's timer; run it on a worker.
    async fn list_directory(&self) -> Result<Vec<RawListingEntry>, TransportError>;

    /// Fetch one file into `dest_dir`, returning the local path.
    async fn download(&self, filename: &str, dest_dir: &Path)
        -> Result<PathBuf, TransportError>;
}

/// Local drop-directory source.
pub struct LocalDirSource {
    root: PathBuf,
    include: GlobSet,
}

impl LocalDirSource {
    pub fn new(config: &RemoteConfig) -> Result<Self, TransportError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.include_globs {
            let glob = Glob::new(pattern)
                .map_err(|e| TransportError::Config(format!("bad glob '{}': {}", pattern, e)))?;
            builder.add(glob);
        }
        let include = builder
            .build()
            .map_err(|e| TransportError::Config(e.to_string()))?;
        Ok(Self {
            root: config.root.clone(),
            include,
        })
    }
}

#[async_trait]
impl RemoteSource for LocalDirSource {
    fn name(&self) -> &str {
        "localdir"
    }

    fn description(&self) -> String {
        format!("local drop directory {}", self.root.display())
    }

    fn healthy(&self) -> bool {
        self.root.is_dir()
    }

    async fn list_directory(&self) -> Result<Vec<RawListingEntry>, TransportError> {
        let root = self.root.clone();
        let include = self.include.clone();

        let entries = tokio::task::spawn_blocking(move || -> Result<_, TransportError> {
            let mut entries = Vec::new();
            for dirent in WalkDir::new(&root).min_depth(1) {
                let dirent = dirent.map_err(|e| TransportError::List {
                    path: root.clone(),
                    source: e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("walk failed")),
                })?;
                if !dirent.file_type().is_file() {
                    continue;
                }
                let filename = dirent.file_name().to_string_lossy().to_string();
                if !include.is_match(&filename) {
                    continue;
                }
                let size = dirent.metadata().map(|m| m.len()).unwrap_or(0);
                entries.push(RawListingEntry { filename, size });
            }
            entries.sort_by(|a, b| a.filename.cmp(&b.filename));
            Ok(entries)
        })
        .await
        .map_err(|e| TransportError::Config(format!("listing task failed: {}", e)))??;

        debug!(count = entries.len(), "listed remote directory");
        Ok(entries)
    }

    async fn download(
        &self,
        filename: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, TransportError> {
        let src = self.root.join(filename);
        let dest = dest_dir.join(filename);
        let name = filename.to_string();

        tokio::task::spawn_blocking(move || -> Result<PathBuf, TransportError> {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(|source| TransportError::Download {
                    filename: name.clone(),
                    source,
                })?;
            }
            std::fs::copy(&src, &dest).map_err(|source| TransportError::Download {
                filename: name.clone(),
                source,
            })?;
            Ok(dest)
        })
        .await
        .map_err(|e| TransportError::Config(format!("download task failed: {}", e)))?
    }
}

/// Resolve the configured source kind to an implementation.
pub fn source_from_config(
    config: &RemoteConfig,
) -> Result<std::sync::Arc<dyn RemoteSource>, TransportError> {
    match config.kind.as_str() {
        "localdir" => Ok(std::sync::Arc::new(LocalDirSource::new(config)?)),
        other => Err(TransportError::Config(format!(
            "unknown remote source kind '{}'",
            other
        ))),
    }
}
