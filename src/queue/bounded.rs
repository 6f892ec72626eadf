//! Bounded Blocking Queue Implementation
//!
//! Fixed capacity MPSC queue with explicit close. Producers block while the
//! queue is full (or are rejected, depending on the configured policy) and the
//! consumer blocks while it is empty. Closing wakes everybody: pending pushes
//! fail, and pops keep returning items until the queue is drained.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::queue::error::{QueueError, QueueResult};

/// What a push does when the queue is at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushPolicy {
    /// Wait until space frees up or the queue is closed
    #[default]
    Block,
    /// Fail immediately with `QueueError::Full`
    Reject,
}

impl std::str::FromStr for PushPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "block" => Ok(PushPolicy::Block),
            "reject" => Ok(PushPolicy::Reject),
            _ => Err(format!("Invalid push policy: {}. Valid options: block, reject", s)),
        }
    }
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Thread-safe bounded FIFO queue
pub struct BoundedQueue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    policy: PushPolicy,
}

impl<T> BoundedQueue<T> {
    /// Create a blocking queue holding at most `capacity` items
    pub fn new(capacity: usize) -> QueueResult<Self> {
        Self::with_policy(capacity, PushPolicy::Block)
    }

    /// Create a queue with an explicit full-queue policy
    pub fn with_policy(capacity: usize, policy: PushPolicy) -> QueueResult<Self> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity(capacity));
        }
        Ok(Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            policy,
        })
    }

    /// Insert at the tail.
    ///
    /// Blocks while the queue is full and open under `PushPolicy::Block`.
    /// Fails with `Closed` if the queue is closed, including when it is
    /// closed while this call is waiting; the item is dropped in that case.
    pub fn push(&self, item: T) -> QueueResult<()> {
        let mut state = self.state.lock();
        while state.items.len() == self.capacity && !state.closed {
            if self.policy == PushPolicy::Reject {
                return Err(QueueError::Full);
            }
            self.not_full.wait(&mut state);
        }
        self.insert(state, item)
    }

    /// Insert without waiting, whatever the configured policy
    pub fn try_push(&self, item: T) -> QueueResult<()> {
        let state = self.state.lock();
        if !state.closed && state.items.len() == self.capacity {
            return Err(QueueError::Full);
        }
        self.insert(state, item)
    }

    /// Insert, waiting at most `timeout` for space
    pub fn push_timeout(&self, item: T, timeout: Duration) -> QueueResult<()> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.push(item);
        };
        let mut state = self.state.lock();
        while state.items.len() == self.capacity && !state.closed {
            if self.not_full.wait_until(&mut state, deadline).timed_out()
                && state.items.len() == self.capacity
                && !state.closed
            {
                return Err(QueueError::Timeout(timeout));
            }
        }
        self.insert(state, item)
    }

    fn insert(&self, mut state: MutexGuard<'_, State<T>>, item: T) -> QueueResult<()> {
        if state.closed {
            return Err(QueueError::Closed);
        }
        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the head, blocking while the queue is open and empty.
    ///
    /// Returns `None` only when the queue is closed *and* empty.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        while state.items.is_empty() && !state.closed {
            self.not_empty.wait(&mut state);
        }
        self.take(state)
    }

    /// Remove the head if one is available right now
    pub fn try_pop(&self) -> Option<T> {
        let state = self.state.lock();
        self.take(state)
    }

    /// Remove the head, waiting at most `timeout`.
    ///
    /// `Ok(None)` means closed and drained, `Err(Timeout)` means the queue is
    /// still open but nothing arrived in time.
    pub fn pop_timeout(&self, timeout: Duration) -> QueueResult<Option<T>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Ok(self.pop());
        };
        let mut state = self.state.lock();
        while state.items.is_empty() && !state.closed {
            if self.not_empty.wait_until(&mut state, deadline).timed_out()
                && state.items.is_empty()
                && !state.closed
            {
                return Err(QueueError::Timeout(timeout));
            }
        }
        Ok(self.take(state))
    }

    fn take(&self, mut state: MutexGuard<'_, State<T>>) -> Option<T> {
        let item = state.items.pop_front();
        let closed = state.closed;
        drop(state);
        if item.is_some() && !closed {
            self.not_full.notify_one();
        }
        item
    }

    /// Close the queue. Idempotent; returns `true` for the call that closed it.
    pub fn close(&self) -> bool {
        let newly_closed = {
            let mut state = self.state.lock();
            !std::mem::replace(&mut state.closed, true)
        };
        self.not_empty.notify_all();
        self.not_full.notify_all();
        newly_closed
    }

    /// Snapshot of the closed flag
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Current number of queued items
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> PushPolicy {
        self.policy
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoundedQueue")
            .field("len", &state.items.len())
            .field("capacity", &self.capacity)
            .field("closed", &state.closed)
            .field("policy", &self.policy)
            .finish()
    }
}
