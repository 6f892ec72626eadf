//! Active objects: message processing serialised onto a private worker thread.
//!
//! Producers on any thread post messages into a bounded FIFO queue; one
//! dedicated thread per object receives them in order and hands each one to a
//! user supplied [`ActiveBehavior`]. Failures are contained to the message that
//! caused them and reported to observers.

pub mod active;
pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod notifications;
pub mod queue;

pub use active::{
    ActiveBehavior, ActiveObject, ActiveObjectConfig, ActiveObjectError, ActiveObjectStats,
    ActiveResult, FnBehavior, ProcessingContext, Sentinel, WorkerState,
};
pub use notifications::{NotificationChannel, ProcessingFailure, SubscriptionId};
pub use queue::{BoundedQueue, PushPolicy, QueueError};
