//! Error types for the replay cache.

use std::io;
use std::path::PathBuf;

use crate::config::ConfigError;

/// A failure of the SQLite store. These are systemic: the worker stops.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored record could not be encoded or decoded.
    #[error("record json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A failure that stops the ingestion loop.
///
/// Problems with individual demo files are not errors here: they become
/// tombstones.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The demo directory could not be listed.
    #[error("failed to scan {}: {source}", path.display())]
    Scan {
        /// The demo directory.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

/// Errors from starting, running or stopping a [`ReplayCache`](crate::ReplayCache).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The worker stopped on an error.
    #[error(transparent)]
    Ingest(#[from] IngestError),
    /// The directory watcher could not be set up.
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
    /// The worker thread could not be spawned.
    #[error("failed to spawn cache worker: {0}")]
    Spawn(#[source] io::Error),
    /// The worker thread panicked.
    #[error("cache worker panicked")]
    WorkerPanicked,
}
