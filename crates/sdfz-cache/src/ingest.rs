//! Per-file ingestion: parse, reconcile duplicates, store or tombstone.
//!
//! [`Ingestor`] owns the [`ReplayStore`] and is the only writer to it. It
//! runs on the cache worker thread, or directly on the caller's thread for
//! a one-shot pass (see [`Ingestor::run_pass`]).

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::Sender;
use sdfz_demo::{read_replay_record, DemoError, ReplayRecord};
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::IngestError;
use crate::events::{CacheEvent, MapProvider};
use crate::probe::FileUseProbe;
use crate::queue::{WorkItem, WorkQueue};
use crate::store::ReplayStore;

/// What happened to one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Parsed and stored.
    Cached,
    /// Could not be decoded; tombstoned.
    Errored,
    /// Another process has the file open; skipped for this pass.
    Deferred,
    /// Already cached or tombstoned; not parsed.
    AlreadyKnown,
    /// A longer capture of the same match is cached; this file lost.
    Superseded,
    /// The file no longer exists.
    Missing,
}

/// Counts from one pass over the queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Files stored.
    pub cached: usize,
    /// Files tombstoned.
    pub errored: usize,
    /// Files skipped because they were in use.
    pub deferred: usize,
    /// Files skipped because they were known.
    pub already_known: usize,
    /// Files that lost duplicate reconciliation.
    pub superseded: usize,
    /// Files gone before they were processed.
    pub missing: usize,
    /// Removals applied.
    pub removed: usize,
}

impl PassSummary {
    fn record(&mut self, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Cached => self.cached += 1,
            IngestOutcome::Errored => self.errored += 1,
            IngestOutcome::Deferred => self.deferred += 1,
            IngestOutcome::AlreadyKnown => self.already_known += 1,
            IngestOutcome::Superseded => self.superseded += 1,
            IngestOutcome::Missing => self.missing += 1,
        }
    }
}

/// Whether capture `a` should be kept over capture `b` of the same match:
/// the longer one wins, and equal lengths go to the first file name.
pub fn keeps_over(a: &ReplayRecord, b: &ReplayRecord) -> bool {
    a.duration_ms > b.duration_ms
        || (a.duration_ms == b.duration_ms && a.file_name < b.file_name)
}

/// Drives files from discovery to a stored record or a tombstone.
pub struct Ingestor {
    store: ReplayStore,
    config: CacheConfig,
    probe: Arc<dyn FileUseProbe>,
    maps: Arc<dyn MapProvider>,
    events: Sender<CacheEvent>,
}

impl Ingestor {
    /// Create an ingestor over `store`.
    pub fn new(
        store: ReplayStore,
        config: CacheConfig,
        probe: Arc<dyn FileUseProbe>,
        maps: Arc<dyn MapProvider>,
        events: Sender<CacheEvent>,
    ) -> Self {
        Self {
            store,
            config,
            probe,
            maps,
            events,
        }
    }

    /// The store.
    pub fn store(&self) -> &ReplayStore {
        &self.store
    }

    /// Give the store back.
    pub fn into_store(self) -> ReplayStore {
        self.store
    }

    fn emit(&self, event: CacheEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Queue every matching file in the demo directory the store does not
    /// know yet, in file name order. Returns how many were queued.
    pub fn scan(&self, queue: &WorkQueue) -> Result<usize, IngestError> {
        let dir = &self.config.demo_dir;
        let scan_err = |source: io::Error| IngestError::Scan {
            path: dir.clone(),
            source,
        };
        let known = self.store.known_file_names()?;

        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            let path = entry.path();
            if !path.is_file() || !self.config.matches_extension(&path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !known.contains(name) {
                names.push(name.to_owned());
            }
        }
        names.sort();

        let queued = names.into_iter().filter(|n| queue.enqueue(n.as_str())).count();
        debug!(dir = %dir.display(), queued, "scanned demo directory");
        Ok(queued)
    }

    /// Delete cached rows whose file is gone. Returns how many.
    pub fn prune_missing(&mut self) -> Result<usize, IngestError> {
        let mut pruned = 0;
        for name in self.store.cached_file_names()? {
            if self.config.replay_path(&name).exists() {
                continue;
            }
            if self.store.delete(&name)? {
                pruned += 1;
                info!(file = %name, "pruned cached replay whose file is gone");
                self.emit(CacheEvent::Deleted(name));
            }
        }
        Ok(pruned)
    }

    /// Apply one queued item.
    pub fn process(&mut self, item: WorkItem) -> Result<Option<IngestOutcome>, IngestError> {
        match item {
            WorkItem::Ingest(name) => self.ingest_file(&name).map(Some),
            WorkItem::Remove(name) => {
                self.remove_file(&name)?;
                Ok(None)
            }
        }
    }

    /// Drain `queue` on the current thread.
    pub fn run_pass(&mut self, queue: &WorkQueue) -> Result<PassSummary, IngestError> {
        let mut summary = PassSummary::default();
        while let Some(item) = queue.pop() {
            match self.process(item)? {
                Some(outcome) => summary.record(outcome),
                None => summary.removed += 1,
            }
        }
        Ok(summary)
    }

    /// The file is gone: drop its row and tombstone.
    pub fn remove_file(&mut self, file_name: &str) -> Result<bool, IngestError> {
        if self.config.replay_path(file_name).exists() {
            // Recreated since the removal was queued.
            return Ok(false);
        }
        let removed = self.store.forget(file_name)?;
        if removed {
            info!(file = %file_name, "removed cached replay");
            self.emit(CacheEvent::Deleted(file_name.to_owned()));
        }
        Ok(removed)
    }

    /// Take one file through the ingestion state machine.
    pub fn ingest_file(&mut self, file_name: &str) -> Result<IngestOutcome, IngestError> {
        let path = self.config.replay_path(file_name);
        if !path.is_file() {
            debug!(file = %file_name, "file vanished before processing");
            return Ok(IngestOutcome::Missing);
        }
        // A record cached before the engine finalized the file is replaced
        // by the next parse; anything else known is left alone.
        if self.store.is_known(file_name)? && !self.store.is_unfinished(file_name)? {
            return Ok(IngestOutcome::AlreadyKnown);
        }
        if self.probe.is_in_use(&path) {
            debug!(file = %file_name, "file in use, deferring");
            return Ok(IngestOutcome::Deferred);
        }

        self.emit(CacheEvent::CachingStarted(file_name.to_owned()));
        match read_replay_record(&path) {
            Ok(record) => self.reconcile(record),
            Err(DemoError::SentinelGameId) => {
                warn!(file = %file_name, "demo has no game id, not caching");
                self.tombstone(file_name)
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "failed to cache demo");
                self.tombstone(file_name)
            }
        }
    }

    fn tombstone(&mut self, file_name: &str) -> Result<IngestOutcome, IngestError> {
        self.store.mark_error(file_name)?;
        self.emit(CacheEvent::Errored(file_name.to_owned()));
        Ok(IngestOutcome::Errored)
    }

    /// Store `record`, first resolving any other capture of the same match.
    fn reconcile(&mut self, record: ReplayRecord) -> Result<IngestOutcome, IngestError> {
        let rivals = self.store.get_by_game_id(&record.game_id)?;
        for rival in rivals.iter().filter(|r| r.file_name != record.file_name) {
            if keeps_over(rival, &record) {
                info!(
                    file = %record.file_name,
                    kept = %rival.file_name,
                    duration_ms = record.duration_ms,
                    kept_duration_ms = rival.duration_ms,
                    "duplicate capture superseded"
                );
                self.discard_loser(&record.file_name)?;
                return Ok(IngestOutcome::Superseded);
            }
        }
        for rival in rivals.iter().filter(|r| r.file_name != record.file_name) {
            info!(
                file = %rival.file_name,
                kept = %record.file_name,
                duration_ms = rival.duration_ms,
                kept_duration_ms = record.duration_ms,
                "duplicate capture superseded"
            );
            self.store.delete(&rival.file_name)?;
            self.discard_loser(&rival.file_name)?;
        }

        self.store.upsert(&record)?;
        info!(
            file = %record.file_name,
            game_id = %record.game_id,
            map = %record.map_spring_name,
            duration_ms = record.duration_ms,
            "cached replay"
        );
        self.maps.ensure_map_available(&record.map_spring_name);
        self.emit(CacheEvent::Cached(Box::new(record)));
        Ok(IngestOutcome::Cached)
    }

    /// Get rid of the losing capture's file, or tombstone it when files
    /// are kept, so it is not parsed again.
    fn discard_loser(&mut self, file_name: &str) -> Result<(), IngestError> {
        if self.config.delete_superseded_files {
            delete_file(&self.config.replay_path(file_name));
        } else {
            self.store.mark_error(file_name)?;
        }
        self.emit(CacheEvent::Deleted(file_name.to_owned()));
        Ok(())
    }
}

fn delete_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to delete superseded demo"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, duration_ms: u64) -> ReplayRecord {
        ReplayRecord {
            file_name: name.into(),
            game_id: sdfz_demo::GameId([1; 16]),
            engine_version: String::new(),
            game_version: String::new(),
            map_spring_name: String::new(),
            start_time: Default::default(),
            duration_ms,
            ended_normally: true,
            teams: vec![],
            contenders: vec![],
            spectators: vec![],
            chatlog: None,
            script: String::new(),
            battle_settings: Default::default(),
            game_settings: Default::default(),
            map_settings: Default::default(),
            host_settings: Default::default(),
        }
    }

    #[test]
    fn longer_capture_wins() {
        assert!(keeps_over(&rec("b", 250_000), &rec("a", 100_000)));
        assert!(!keeps_over(&rec("a", 100_000), &rec("b", 250_000)));
    }

    #[test]
    fn equal_durations_go_to_first_name() {
        assert!(keeps_over(&rec("a", 5), &rec("b", 5)));
        assert!(!keeps_over(&rec("b", 5), &rec("a", 5)));
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut s = PassSummary::default();
        s.record(IngestOutcome::Cached);
        s.record(IngestOutcome::Cached);
        s.record(IngestOutcome::Deferred);
        assert_eq!(s.cached, 2);
        assert_eq!(s.deferred, 1);
    }
}
