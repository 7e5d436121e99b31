//! Persistent, deduplicating cache of parsed Spring demos.
//!
//! The cache watches a demo directory, parses every finished demo once, and
//! keeps the resulting [`ReplayRecord`](sdfz_demo::ReplayRecord)s in SQLite.
//! Files that fail to parse are tombstoned so they are never parsed again.
//! When several players upload the same match, only the longest capture is
//! kept.
//!
//! # Architecture
//!
//! - [`ReplayCache`] owns a worker thread and an optional directory watcher
//! - [`WorkQueue`] collects file names from the startup scan and the watcher
//! - [`Ingestor`] takes one file at a time to a stored record or a tombstone
//! - [`ReplayStore`] is the SQLite layer, owned by the worker
//! - [`FileUseProbe`] keeps files the engine is still writing out of the cache
//!
//! Without a running cache, an [`Ingestor`] can drain a queue directly on
//! the caller's thread with [`Ingestor::run_pass`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod ingest;
pub mod probe;
pub mod queue;
pub mod store;
mod watcher;
mod worker;

pub use cache::ReplayCache;
pub use config::{CacheConfig, ConfigError};
pub use error::{CacheError, IngestError, StoreError};
pub use events::{CacheEvent, MapProvider, NoMaps};
pub use ingest::{keeps_over, IngestOutcome, Ingestor, PassSummary};
pub use probe::{system_probe, FileUseProbe, NeverInUse, SystemProbe};
pub use queue::{WorkItem, WorkQueue};
pub use store::ReplayStore;
