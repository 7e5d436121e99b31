//! Notifications emitted by the cache and the map collaborator.

use sdfz_demo::ReplayRecord;

/// A change to the cache, delivered in the order it happened.
#[derive(Clone, Debug, PartialEq)]
pub enum CacheEvent {
    /// The worker started parsing a file.
    CachingStarted(String),
    /// A record was stored.
    Cached(Box<ReplayRecord>),
    /// A cached record (and, for superseded duplicates, its file) is gone.
    Deleted(String),
    /// A file could not be decoded and was tombstoned.
    Errored(String),
}

impl CacheEvent {
    /// The file the event is about.
    pub fn file_name(&self) -> &str {
        match self {
            CacheEvent::CachingStarted(name)
            | CacheEvent::Deleted(name)
            | CacheEvent::Errored(name) => name,
            CacheEvent::Cached(record) => &record.file_name,
        }
    }
}

/// Makes sure a map referenced by a cached replay is available locally.
///
/// Called after every successful cache. The call must not block the
/// worker for long: hand the download off and return.
pub trait MapProvider: Send + Sync {
    /// Request the map with the given spring name.
    fn ensure_map_available(&self, spring_name: &str);
}

/// A provider that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoMaps;

impl MapProvider for NoMaps {
    fn ensure_map_available(&self, _spring_name: &str) {}
}
