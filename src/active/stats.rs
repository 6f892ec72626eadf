//! Active object counters and statistics snapshot

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::active::lifecycle::WorkerState;

/// Monotonic message counters shared between producers and the worker
#[derive(Debug, Default)]
pub struct Counters {
    posted: AtomicU64,
    processed: AtomicU64,
    /// Subset of `processed` that errored or panicked
    failed: AtomicU64,
}

impl Counters {
    /// Count a post before it is pushed, so the worker can never observe a
    /// message that has not been counted yet
    pub(crate) fn reserve_post(&self) {
        self.posted.fetch_add(1, Ordering::SeqCst);
    }

    /// Undo `reserve_post` for a push that failed
    pub(crate) fn cancel_post(&self) {
        self.posted.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn posted(&self) -> u64 {
        self.posted.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Point-in-time view of an active object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveObjectStats {
    pub name: String,
    pub state: WorkerState,
    pub started: bool,
    pub stopped: bool,
    pub messages_posted: u64,
    pub messages_processed: u64,
    pub messages_failed: u64,
    pub queued: usize,
    pub capacity: usize,
}

impl ActiveObjectStats {
    /// Messages posted but not processed yet
    pub fn outstanding(&self) -> u64 {
        self.messages_posted.saturating_sub(self.messages_processed)
    }

    /// Messages processed without error or panic
    pub fn succeeded(&self) -> u64 {
        self.messages_processed.saturating_sub(self.messages_failed)
    }

    /// One line summary for log output
    pub fn summary(&self) -> String {
        format!(
            "{} [{}] posted: {} | processed: {} | failed: {} | queued: {}/{}",
            self.name,
            self.state,
            self.messages_posted,
            self.messages_processed,
            self.messages_failed,
            self.queued,
            self.capacity
        )
    }
}
