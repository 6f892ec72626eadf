//! Worker Lifecycle State
//!
//! Shared state cell written by the worker thread and waited on by `start`
//! (ready handshake) and `stop` (exit with timeout).

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

/// Lifecycle of the worker thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Constructed, no thread yet
    Dormant,
    /// Thread spawned, setup hook running
    Starting,
    /// Receiving and dispatching messages
    Running,
    /// Stop sentinel received, loop is unwinding
    Draining,
    /// Loop exited and teardown hook has run
    Exited,
}

impl WorkerState {
    /// Whether `start`'s handshake is still pending in this state
    fn is_pending(self) -> bool {
        matches!(self, WorkerState::Dormant | WorkerState::Starting)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkerState::Dormant => "dormant",
            WorkerState::Starting => "starting",
            WorkerState::Running => "running",
            WorkerState::Draining => "draining",
            WorkerState::Exited => "exited",
        };
        f.write_str(label)
    }
}

/// State cell with blocking waits
#[derive(Debug)]
pub struct WorkerStatus {
    state: Mutex<WorkerState>,
    changed: Condvar,
}

impl WorkerStatus {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WorkerState::Dormant),
            changed: Condvar::new(),
        }
    }

    pub fn current(&self) -> WorkerState {
        *self.state.lock()
    }

    /// Move to `next` and wake every waiter
    pub fn set(&self, next: WorkerState) {
        *self.state.lock() = next;
        self.changed.notify_all();
    }

    /// Wait until the worker leaves the dormant/starting states.
    ///
    /// Returns the state observed when the wait ended, which is still
    /// `Starting` (or `Dormant`) if the timeout elapsed first.
    pub fn wait_until_ready(&self, timeout: Duration) -> WorkerState {
        self.wait_while(timeout, WorkerState::is_pending)
    }

    /// Wait until the worker has exited. Returns `true` if it did in time.
    pub fn wait_for_exit(&self, timeout: Duration) -> bool {
        self.wait_while(timeout, |state| state != WorkerState::Exited) == WorkerState::Exited
    }

    fn wait_while(&self, timeout: Duration, pending: impl Fn(WorkerState) -> bool) -> WorkerState {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        while pending(*state) {
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
                // Timeout too large to represent: wait without a bound
                None => self.changed.wait(&mut state),
            }
        }
        *state
    }
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks the worker `Exited` when dropped, on every exit path
pub(crate) struct ExitGuard<'a>(pub(crate) &'a WorkerStatus);

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.0.set(WorkerState::Exited);
    }
}
