//! Directory watcher feeding the work queue.
//!
//! The notify callback runs on the watcher's own thread. It only turns
//! events into queue entries; all parsing and store access happens on the
//! cache worker.

use std::path::Path;
use std::sync::Arc;

use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::warn;

use crate::config::CacheConfig;
use crate::queue::WorkQueue;

/// Start watching `config.demo_dir`. Events stop when the returned
/// watcher is dropped.
pub(crate) fn watch(
    config: &CacheConfig,
    queue: Arc<WorkQueue>,
) -> Result<RecommendedWatcher, notify::Error> {
    let filter = config.clone();
    let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
        match result {
            Ok(event) => route_event(&event, &filter, &queue),
            Err(e) => warn!(error = %e, "demo directory watcher error"),
        }
    })?;
    watcher.watch(&config.demo_dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn file_name<'a>(path: &'a Path, config: &CacheConfig) -> Option<&'a str> {
    if !config.matches_extension(path) {
        return None;
    }
    path.file_name()?.to_str()
}

fn names<'a>(event: &'a Event, config: &'a CacheConfig) -> impl Iterator<Item = &'a str> + 'a {
    event.paths.iter().filter_map(move |p| file_name(p, config))
}

/// Translate one notify event into queue operations.
pub(crate) fn route_event(event: &Event, config: &CacheConfig, queue: &WorkQueue) {
    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths = [from, to]
            if let Some(from) = event.paths.first().and_then(|p| file_name(p, config)) {
                queue.enqueue_removal(from);
            }
            if let Some(to) = event.paths.get(1).and_then(|p| file_name(p, config)) {
                queue.enqueue(to);
            }
        }
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            for name in names(event, config) {
                queue.enqueue_removal(name);
            }
        }
        EventKind::Create(_)
        | EventKind::Access(AccessKind::Close(AccessMode::Write))
        | EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Name(_)) => {
            for name in names(event, config) {
                queue.enqueue(name);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::WorkItem;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |e, p| e.add_path((*p).into()))
    }

    #[test]
    fn create_and_close_write_enqueue() {
        let q = WorkQueue::new();
        let c = CacheConfig::default();
        route_event(&event(EventKind::Create(CreateKind::File), &["/d/a.sdfz"]), &c, &q);
        route_event(
            &event(
                EventKind::Access(AccessKind::Close(AccessMode::Write)),
                &["/d/a.sdfz", "/d/b.sdfz"],
            ),
            &c,
            &q,
        );
        route_event(
            &event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), &["/d/c.sdfz"]),
            &c,
            &q,
        );
        assert_eq!(q.len(), 3);
        assert_eq!(q.pop(), Some(WorkItem::Ingest("a.sdfz".into())));
    }

    #[test]
    fn remove_enqueues_removal() {
        let q = WorkQueue::new();
        let c = CacheConfig::default();
        q.enqueue("a.sdfz");
        route_event(&event(EventKind::Remove(RemoveKind::File), &["/d/a.sdfz"]), &c, &q);
        assert_eq!(q.pop(), Some(WorkItem::Remove("a.sdfz".into())));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn rename_moves_entry() {
        let q = WorkQueue::new();
        let c = CacheConfig::default();
        route_event(
            &event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/d/old.sdfz", "/d/new.sdfz"],
            ),
            &c,
            &q,
        );
        assert_eq!(q.pop(), Some(WorkItem::Remove("old.sdfz".into())));
        assert_eq!(q.pop(), Some(WorkItem::Ingest("new.sdfz".into())));
    }

    #[test]
    fn other_extensions_and_kinds_are_ignored() {
        let q = WorkQueue::new();
        let c = CacheConfig::default();
        route_event(&event(EventKind::Create(CreateKind::File), &["/d/notes.txt"]), &c, &q);
        route_event(
            &event(EventKind::Access(AccessKind::Read), &["/d/a.sdfz"]),
            &c,
            &q,
        );
        assert!(q.is_empty());
    }
}
