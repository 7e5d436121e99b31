//! Pending work shared between the directory watcher and the worker.
//!
//! The queue holds file names, not events: any number of notifications for
//! one file collapse into a single entry. A later notification of the
//! opposite kind cancels the earlier one, so a file created and removed
//! before the worker gets to it is never parsed.

use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexSet;

/// One unit of work for the cache worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkItem {
    /// Parse and cache the file.
    Ingest(String),
    /// The file is gone; drop what is known about it.
    Remove(String),
}

#[derive(Debug, Default)]
struct QueueState {
    pending: IndexSet<String>,
    removals: IndexSet<String>,
}

/// Insertion-ordered, deduplicating work queue.
///
/// # Examples
///
/// ```
/// use sdfz_cache::{WorkItem, WorkQueue};
///
/// let queue = WorkQueue::new();
/// assert!(queue.enqueue("a.sdfz"));
/// assert!(!queue.enqueue("a.sdfz"));
/// queue.enqueue_removal("a.sdfz");
/// assert_eq!(queue.pop(), Some(WorkItem::Remove("a.sdfz".into())));
/// assert_eq!(queue.pop(), None);
/// ```
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
}

impl WorkQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // The state is two sets; a panic mid-update cannot break them.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `file_name` for ingestion, cancelling a pending removal.
    ///
    /// Returns whether the name was not already pending.
    pub fn enqueue(&self, file_name: impl Into<String>) -> bool {
        let file_name = file_name.into();
        let mut state = self.lock();
        state.removals.shift_remove(&file_name);
        state.pending.insert(file_name)
    }

    /// Queue `file_name` for removal, cancelling a pending ingestion.
    ///
    /// Returns whether the removal was not already pending.
    pub fn enqueue_removal(&self, file_name: impl Into<String>) -> bool {
        let file_name = file_name.into();
        let mut state = self.lock();
        state.pending.shift_remove(&file_name);
        state.removals.insert(file_name)
    }

    /// Take the next item. Removals go first, then ingestions in the order
    /// they were first queued.
    pub fn pop(&self) -> Option<WorkItem> {
        let mut state = self.lock();
        if let Some(name) = state.removals.shift_remove_index(0) {
            return Some(WorkItem::Remove(name));
        }
        state.pending.shift_remove_index(0).map(WorkItem::Ingest)
    }

    /// Whether `file_name` is waiting for ingestion.
    pub fn is_pending(&self, file_name: &str) -> bool {
        self.lock().pending.contains(file_name)
    }

    /// Number of queued items of either kind.
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.pending.len() + state.removals.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_insertion_order() {
        let q = WorkQueue::new();
        q.enqueue("b");
        q.enqueue("a");
        q.enqueue("b");
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop(), Some(WorkItem::Ingest("b".into())));
        assert_eq!(q.pop(), Some(WorkItem::Ingest("a".into())));
        assert!(q.is_empty());
    }

    #[test]
    fn enqueue_cancels_removal() {
        let q = WorkQueue::new();
        q.enqueue_removal("a");
        q.enqueue("a");
        assert_eq!(q.pop(), Some(WorkItem::Ingest("a".into())));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn removals_come_first() {
        let q = WorkQueue::new();
        q.enqueue("a");
        q.enqueue_removal("b");
        assert_eq!(q.pop(), Some(WorkItem::Remove("b".into())));
        assert!(q.is_pending("a"));
    }

    #[test]
    fn shared_across_threads() {
        let q = std::sync::Arc::new(WorkQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let q = std::sync::Arc::clone(&q);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        q.enqueue(format!("{}.sdfz", (t * 7 + i) % 60));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(q.len() <= 60);
        let mut seen = std::collections::HashSet::new();
        while let Some(WorkItem::Ingest(name)) = q.pop() {
            assert!(seen.insert(name));
        }
    }
}
