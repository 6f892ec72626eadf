//! Message Loop
//!
//! Runs on the worker thread. Receives messages in FIFO order, dispatches
//! each one to the behaviour with per-message failure isolation, and exits on
//! the stop sentinel or when the queue reports closed-and-empty.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::active::behavior::{ActiveBehavior, ProcessingContext};
use crate::active::error::{ActiveObjectError, ActiveResult};
use crate::active::lifecycle::{ExitGuard, WorkerState};
use crate::active::object::Shared;
use crate::notifications::events::panic_message;
use crate::notifications::ProcessingFailure;

const BEFORE_HOOK: &str = "before_process_messages";
const AFTER_HOOK: &str = "after_process_messages";

/// Why the receive loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    Sentinel,
    QueueClosed,
}

pub(crate) struct MessageLoop<B: ActiveBehavior> {
    shared: Arc<Shared<B::Message>>,
    behavior: B,
    dispatched: u64,
}

impl<B: ActiveBehavior> MessageLoop<B> {
    pub(crate) fn new(shared: Arc<Shared<B::Message>>, behavior: B) -> Self {
        Self {
            shared,
            behavior,
            dispatched: 0,
        }
    }

    /// Worker entry point.
    ///
    /// `after_process_messages` runs exactly once whatever ends the loop, and
    /// the lifecycle is marked `Exited` only after it has returned.
    pub(crate) fn run(mut self) -> ActiveResult<()> {
        let shared = Arc::clone(&self.shared);
        let _exit = ExitGuard(&shared.status);
        shared.status.set(WorkerState::Starting);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.receive_all()));
        let teardown = panic::catch_unwind(AssertUnwindSafe(|| self.teardown()));

        let result = match outcome {
            Ok(Ok(exit)) => {
                info!(
                    "Active object '{}' finished ({:?}) after {} messages",
                    shared.name, exit, self.dispatched
                );
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(payload) => Err(ActiveObjectError::WorkerPanicked {
                name: shared.name.clone(),
                reason: panic_message(payload.as_ref()),
            }),
        };

        let teardown = match teardown {
            Ok(teardown) => teardown,
            Err(payload) => Err(ActiveObjectError::WorkerPanicked {
                name: shared.name.clone(),
                reason: panic_message(payload.as_ref()),
            }),
        };

        if let Err(e) = &result {
            error!("{}", e);
        }
        if let Err(e) = &teardown {
            error!("{}", e);
        }
        // The loop failure is the root cause when both failed
        result.and(teardown)
    }

    fn receive_all(&mut self) -> ActiveResult<LoopExit> {
        let shared = Arc::clone(&self.shared);
        {
            let ctx = ProcessingContext::new(&shared.name, 0, &shared.notifications);
            self.behavior
                .before_process_messages(&ctx)
                .map_err(|e| ActiveObjectError::hook(shared.name.as_str(), BEFORE_HOOK, &e))?;
        }

        shared.started.store(true, Ordering::SeqCst);
        shared.status.set(WorkerState::Running);
        debug!("Active object '{}' ready", shared.name);

        loop {
            let Some(message) = shared.queue.pop() else {
                debug!("Queue of '{}' closed and drained", shared.name);
                return Ok(LoopExit::QueueClosed);
            };

            if B::is_stop_message(&message) {
                shared.status.set(WorkerState::Draining);
                debug!("Active object '{}' received stop message", shared.name);
                return Ok(LoopExit::Sentinel);
            }

            self.dispatch(&message);
        }
    }

    /// Process one message, containing errors and panics to it
    fn dispatch(&mut self, message: &B::Message) {
        let shared = Arc::clone(&self.shared);
        let sequence = self.dispatched;
        self.dispatched += 1;

        let ctx = ProcessingContext::new(&shared.name, sequence, &shared.notifications);
        let behavior = &mut self.behavior;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> anyhow::Result<()> {
            behavior.process_message(&ctx, message)?;
            ctx.notifications().notify_processed(message);
            Ok(())
        }));

        // Failed messages still count as processed; `failed` is the subset
        // that errored or panicked
        shared.counters.record_processed();
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => ProcessingFailure::from_error(shared.name.as_str(), sequence, &e),
            Err(payload) => ProcessingFailure::from_panic(shared.name.as_str(), sequence, payload.as_ref()),
        };

        shared.counters.record_failed();
        warn!("{}", failure);
        shared.notifications.notify_exception(&failure);
    }

    fn teardown(&mut self) -> ActiveResult<()> {
        let shared = Arc::clone(&self.shared);
        let ctx = ProcessingContext::new(&shared.name, self.dispatched, &shared.notifications);
        self.behavior
            .after_process_messages(&ctx)
            .map_err(|e| ActiveObjectError::hook(shared.name.as_str(), AFTER_HOOK, &e))
    }
}
