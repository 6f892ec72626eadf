//! Notification Channel
//!
//! Observer lists for the two notification kinds. Registration may happen from
//! any thread at any time; delivery happens on the worker thread, in
//! registration order.
//!
//! Each list is copy-on-write: registration swaps in a new `Arc<Vec<_>>`, and
//! delivery clones the current `Arc` and iterates it without holding the lock,
//! so a callback may register or unregister observers without deadlocking.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::error;
use parking_lot::RwLock;

use crate::notifications::events::{panic_message, NotificationKind, ProcessingFailure};

/// Handle returned by a registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type ProcessedCallback<M> = Arc<dyn Fn(&M) + Send + Sync>;
type ExceptionCallback = Arc<dyn Fn(&ProcessingFailure) + Send + Sync>;

struct Entry<F: ?Sized> {
    id: SubscriptionId,
    callback: Arc<F>,
}

impl<F: ?Sized> Clone for Entry<F> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

type List<F> = RwLock<Arc<Vec<Entry<F>>>>;

/// Registered observers for an active object's messages
pub struct NotificationChannel<M> {
    next_id: AtomicU64,
    processed: List<dyn Fn(&M) + Send + Sync>,
    exceptions: List<dyn Fn(&ProcessingFailure) + Send + Sync>,
}

impl<M> NotificationChannel<M> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            processed: RwLock::new(Arc::new(Vec::new())),
            exceptions: RwLock::new(Arc::new(Vec::new())),
        }
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a callback invoked after every successfully processed message
    pub fn subscribe_processed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        let callback: ProcessedCallback<M> = Arc::new(callback);
        let id = self.allocate_id();
        append(&self.processed, Entry { id, callback });
        id
    }

    /// Register a callback invoked for every message that failed or panicked
    pub fn subscribe_exception<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ProcessingFailure) + Send + Sync + 'static,
    {
        let callback: ExceptionCallback = Arc::new(callback);
        let id = self.allocate_id();
        append(&self.exceptions, Entry { id, callback });
        id
    }

    /// Remove a registration of either kind. Returns `false` if it was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        remove(&self.processed, id) || remove(&self.exceptions, id)
    }

    /// Number of observers registered for `kind`
    pub fn subscriber_count(&self, kind: NotificationKind) -> usize {
        match kind {
            NotificationKind::MessageProcessed => self.processed.read().len(),
            NotificationKind::ExceptionCaught => self.exceptions.read().len(),
        }
    }

    /// Deliver a processed message to every observer, in registration order.
    ///
    /// Panics propagate to the caller, which treats them as a failure of the
    /// message being dispatched.
    pub fn notify_processed(&self, message: &M) {
        let snapshot = Arc::clone(&self.processed.read());
        for entry in snapshot.iter() {
            (entry.callback)(message);
        }
    }

    /// Deliver a failure to every exception observer.
    ///
    /// A panicking observer is logged and skipped; it never reaches the loop.
    pub fn notify_exception(&self, failure: &ProcessingFailure) {
        let snapshot = Arc::clone(&self.exceptions.read());
        for entry in snapshot.iter() {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| (entry.callback)(failure)));
            if let Err(payload) = delivered {
                error!(
                    "Exception observer {} panicked while handling {}: {}",
                    entry.id,
                    failure,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

impl<M> Default for NotificationChannel<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for NotificationChannel<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("processed", &self.processed.read().len())
            .field("exceptions", &self.exceptions.read().len())
            .finish()
    }
}

fn append<F: ?Sized>(list: &List<F>, entry: Entry<F>) {
    let mut guard = list.write();
    let mut entries = Vec::with_capacity(guard.len() + 1);
    entries.extend(guard.iter().cloned());
    entries.push(entry);
    *guard = Arc::new(entries);
}

fn remove<F: ?Sized>(list: &List<F>, id: SubscriptionId) -> bool {
    let mut guard = list.write();
    if !guard.iter().any(|entry| entry.id == id) {
        return false;
    }
    let entries: Vec<_> = guard.iter().filter(|entry| entry.id != id).cloned().collect();
    *guard = Arc::new(entries);
    true
}
