//! The cache worker loop.
//!
//! ```text
//! startup:  prune_missing? -> scan -> queue
//! loop:     shutdown_rx.try_recv()  -> stop
//!           queue.pop()             -> ingestor.process()
//!           queue empty             -> shutdown_rx.recv_timeout(idle)
//! ```
//!
//! Only a [`StoreError`](crate::StoreError) (or a failed startup scan) ends
//! the loop early; per-file failures are tombstones.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use tracing::{debug, error, info};

use crate::error::IngestError;
use crate::ingest::Ingestor;
use crate::queue::WorkQueue;
use crate::store::ReplayStore;

/// Run until `shutdown_rx` fires or disconnects, then return the store.
pub(crate) fn run(
    mut ingestor: Ingestor,
    prune_missing: bool,
    queue: Arc<WorkQueue>,
    shutdown_rx: Receiver<()>,
    idle: Duration,
) -> Result<ReplayStore, IngestError> {
    let result = work(&mut ingestor, prune_missing, &queue, &shutdown_rx, idle);
    if let Err(e) = &result {
        error!(error = %e, "cache worker stopped");
    }
    result.map(|()| ingestor.into_store())
}

fn work(
    ingestor: &mut Ingestor,
    prune_missing: bool,
    queue: &WorkQueue,
    shutdown_rx: &Receiver<()>,
    idle: Duration,
) -> Result<(), IngestError> {
    if prune_missing {
        let pruned = ingestor.prune_missing()?;
        if pruned > 0 {
            info!(pruned, "pruned missing replays");
        }
    }
    let queued = ingestor.scan(queue)?;
    info!(queued, "cache worker started");

    loop {
        match shutdown_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }
        if let Some(item) = queue.pop() {
            if let Some(outcome) = ingestor.process(item)? {
                debug!(?outcome, "processed file");
            }
            continue;
        }
        match shutdown_rx.recv_timeout(idle) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
    debug!("cache worker stopping");
    Ok(())
}
