//! User-facing [`ReplayCache`] handle and its shutdown sequence.
//!
//! ```text
//! Caller                    Watcher (notify)          Worker "sdfz-cache"
//!   |                            |                          |
//!   | start() ----------------------------------------------> prune, scan
//!   |                            | route_event()            |
//!   |                            |--> WorkQueue <-----------| queue.pop()
//!   | enqueue() ----------------------> WorkQueue           | ingestor.process()
//!   |<-- events: CacheEvent ------------------------------- |
//!   | shutdown() -- shutdown_tx ---------------------------> break
//!   |<-- ReplayStore (join) ------------------------------- |
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use notify::RecommendedWatcher;
use tracing::warn;

use crate::config::CacheConfig;
use crate::error::{CacheError, IngestError};
use crate::events::{CacheEvent, MapProvider, NoMaps};
use crate::ingest::Ingestor;
use crate::probe::{system_probe, FileUseProbe};
use crate::queue::WorkQueue;
use crate::store::ReplayStore;
use crate::{watcher, worker};

/// A running replay cache: a worker thread that owns the store, plus an
/// optional directory watcher.
pub struct ReplayCache {
    config: CacheConfig,
    queue: Arc<WorkQueue>,
    events: Receiver<CacheEvent>,
    shutdown_tx: Sender<()>,
    worker: Option<JoinHandle<Result<ReplayStore, IngestError>>>,
    watcher: Option<RecommendedWatcher>,
}

impl ReplayCache {
    /// Start with the platform file-use probe and no map provider.
    pub fn start(config: CacheConfig, store: ReplayStore) -> Result<Self, CacheError> {
        Self::start_with(config, store, system_probe(), Arc::new(NoMaps))
    }

    /// Start with explicit collaborators.
    pub fn start_with(
        config: CacheConfig,
        store: ReplayStore,
        probe: Arc<dyn FileUseProbe>,
        maps: Arc<dyn MapProvider>,
    ) -> Result<Self, CacheError> {
        config.validate()?;

        let queue = Arc::new(WorkQueue::new());
        let (event_tx, events) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        // Watch before the startup scan so files created in between are
        // not missed. Duplicate enqueues collapse.
        let watcher = if config.watch {
            Some(watcher::watch(&config, Arc::clone(&queue))?)
        } else {
            None
        };

        let ingestor = Ingestor::new(store, config.clone(), probe, maps, event_tx);
        let worker_queue = Arc::clone(&queue);
        let prune_missing = config.prune_missing;
        let idle = config.idle_interval;
        let worker = thread::Builder::new()
            .name("sdfz-cache".into())
            .spawn(move || worker::run(ingestor, prune_missing, worker_queue, shutdown_rx, idle))
            .map_err(CacheError::Spawn)?;

        Ok(Self {
            config,
            queue,
            events,
            shutdown_tx,
            worker: Some(worker),
            watcher,
        })
    }

    /// Receiver for cache events. Clones share one stream.
    pub fn events(&self) -> &Receiver<CacheEvent> {
        &self.events
    }

    /// Queue a file in the demo directory for ingestion.
    pub fn enqueue(&self, file_name: impl Into<String>) -> bool {
        self.queue.enqueue(file_name)
    }

    /// Number of queued items.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Full path of a cached replay, for launching it.
    pub fn replay_path(&self, file_name: &str) -> PathBuf {
        self.config.replay_path(file_name)
    }

    /// The configuration the cache was started with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Whether the worker is still running.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Stop the watcher, let the in-flight file finish, join the worker,
    /// and return the store.
    pub fn shutdown(mut self) -> Result<ReplayStore, CacheError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<ReplayStore, CacheError> {
        self.watcher = None;
        // Full or disconnected both mean the worker will stop.
        let _ = self.shutdown_tx.try_send(());
        let worker = self.worker.take().ok_or(CacheError::WorkerPanicked)?;
        match worker.join() {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::WorkerPanicked),
        }
    }
}

impl Drop for ReplayCache {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.stop() {
                warn!(error = %e, "replay cache stopped with an error");
            }
        }
    }
}

impl std::fmt::Debug for ReplayCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayCache")
            .field("demo_dir", &self.config.demo_dir)
            .field("pending", &self.queue.len())
            .field("watching", &self.watcher.is_some())
            .field("running", &self.is_running())
            .finish()
    }
}
