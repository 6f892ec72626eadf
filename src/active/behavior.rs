//! Behaviour Contract
//!
//! What a concrete active object supplies: how to recognise and build the stop
//! sentinel, how to process one message, and optional per-thread setup and
//! teardown. All hooks run on the worker thread; the sentinel functions are
//! associated functions so the stop protocol can run on the caller's thread.

use std::fmt;
use std::marker::PhantomData;

use anyhow::Result;

use crate::notifications::NotificationChannel;

/// Per-dispatch information handed to the hooks
pub struct ProcessingContext<'a, M> {
    name: &'a str,
    sequence: u64,
    notifications: &'a NotificationChannel<M>,
}

impl<'a, M> ProcessingContext<'a, M> {
    pub(crate) fn new(name: &'a str, sequence: u64, notifications: &'a NotificationChannel<M>) -> Self {
        Self {
            name,
            sequence,
            notifications,
        }
    }

    /// Diagnostic name of the active object
    pub fn name(&self) -> &str {
        self.name
    }

    /// Zero based receive position of the message being processed.
    ///
    /// In `before_process_messages` this is 0; in `after_process_messages` it
    /// is the number of messages that were dispatched.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Observers of the owning active object
    pub fn notifications(&self) -> &NotificationChannel<M> {
        self.notifications
    }
}

impl<M> fmt::Debug for ProcessingContext<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingContext")
            .field("name", &self.name)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Behaviour run by an active object's worker thread
pub trait ActiveBehavior: Send + 'static {
    /// Unit of work carried through the queue
    type Message: Send + 'static;

    /// Whether a dequeued message is the shutdown sentinel
    fn is_stop_message(message: &Self::Message) -> bool;

    /// Build the shutdown sentinel posted by `stop`
    fn stop_message() -> Self::Message;

    /// Runs once on the worker thread before the first message is received.
    ///
    /// An error here is not isolated: the worker exits (after running
    /// `after_process_messages`) and `start` reports failure.
    fn before_process_messages(&mut self, _ctx: &ProcessingContext<'_, Self::Message>) -> Result<()> {
        Ok(())
    }

    /// Process one message.
    ///
    /// Errors and panics are contained to this message and reported through
    /// the exception observers. Processed observers are notified by the loop
    /// after this returns `Ok`.
    fn process_message(
        &mut self,
        ctx: &ProcessingContext<'_, Self::Message>,
        message: &Self::Message,
    ) -> Result<()>;

    /// Runs exactly once after the loop exits, on every exit path
    fn after_process_messages(&mut self, _ctx: &ProcessingContext<'_, Self::Message>) -> Result<()> {
        Ok(())
    }
}

/// Message types that carry their own stop sentinel
pub trait Sentinel: Sized {
    fn stop() -> Self;
    fn is_stop(&self) -> bool;
}

/// `None` is the sentinel for optional payloads
impl<T> Sentinel for Option<T> {
    fn stop() -> Self {
        None
    }

    fn is_stop(&self) -> bool {
        self.is_none()
    }
}

/// Behaviour built from a closure, for message types implementing `Sentinel`
pub struct FnBehavior<M, F> {
    handler: F,
    _message: PhantomData<fn() -> M>,
}

impl<M, F> FnBehavior<M, F>
where
    F: FnMut(&ProcessingContext<'_, M>, &M) -> Result<()>,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _message: PhantomData,
        }
    }
}

impl<M, F> ActiveBehavior for FnBehavior<M, F>
where
    M: Sentinel + Send + 'static,
    F: FnMut(&ProcessingContext<'_, M>, &M) -> Result<()> + Send + 'static,
{
    type Message = M;

    fn is_stop_message(message: &M) -> bool {
        message.is_stop()
    }

    fn stop_message() -> M {
        M::stop()
    }

    fn process_message(&mut self, ctx: &ProcessingContext<'_, M>, message: &M) -> Result<()> {
        (self.handler)(ctx, message)
    }
}
