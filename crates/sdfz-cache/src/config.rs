//! Cache configuration, validation, and error types.
//!
//! [`CacheConfig`] is the input for [`ReplayCache::start`](crate::ReplayCache::start).
//! [`validate()`](CacheConfig::validate) checks it before any thread is
//! spawned.

use std::path::{Path, PathBuf};
use std::time::Duration;

// ── CacheConfig ───────────────────────────────────────────────────

/// Configuration for a [`ReplayCache`](crate::ReplayCache).
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Directory holding the demo files.
    pub demo_dir: PathBuf,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// File extensions picked up by the scan and the watcher, without the
    /// dot, matched case-insensitively. Default: `["sdfz"]`.
    pub extensions: Vec<String>,
    /// How long the worker waits for new work before checking again.
    /// Default: 500 ms.
    pub idle_interval: Duration,
    /// Watch `demo_dir` for new and removed files. Default: true.
    pub watch: bool,
    /// Drop cached rows whose file is gone at startup. Default: true.
    pub prune_missing: bool,
    /// Delete the source file of a superseded duplicate capture.
    /// Default: true.
    pub delete_superseded_files: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            demo_dir: PathBuf::from("demos"),
            database_path: PathBuf::from("replays.sqlite3"),
            extensions: vec!["sdfz".into()],
            idle_interval: Duration::from_millis(500),
            watch: true,
            prune_missing: true,
            delete_superseded_files: true,
        }
    }
}

impl CacheConfig {
    /// Default configuration for a demo directory and database file.
    pub fn new(demo_dir: impl Into<PathBuf>, database_path: impl Into<PathBuf>) -> Self {
        Self {
            demo_dir: demo_dir.into(),
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::NoExtensions);
        }
        if self.idle_interval.is_zero() {
            return Err(ConfigError::ZeroIdleInterval);
        }
        if !self.demo_dir.is_dir() {
            return Err(ConfigError::DemoDirMissing {
                path: self.demo_dir.clone(),
            });
        }
        Ok(())
    }

    /// Whether `path` has one of the configured extensions.
    pub fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// Full path of a demo file in `demo_dir`.
    pub fn replay_path(&self, file_name: &str) -> PathBuf {
        self.demo_dir.join(file_name)
    }
}

// ── ConfigError ───────────────────────────────────────────────────

/// Errors detected by [`CacheConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No file extension to match.
    #[error("no demo file extensions configured")]
    NoExtensions,
    /// The worker would spin.
    #[error("idle interval must be non-zero")]
    ZeroIdleInterval,
    /// The demo directory does not exist or is not a directory.
    #[error("demo directory {} does not exist", path.display())]
    DemoDirMissing {
        /// The configured directory.
        path: PathBuf,
    },
}
