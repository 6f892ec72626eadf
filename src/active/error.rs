//! Active Object Error Types

use std::time::Duration;
use thiserror::Error;

use crate::queue::QueueError;

/// Result type for active object operations
pub type ActiveResult<T> = Result<T, ActiveObjectError>;

/// Errors raised by the active object lifecycle
#[derive(Debug, Error)]
pub enum ActiveObjectError {
    /// The worker thread could not be created
    #[error("Failed to spawn worker thread for '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The worker did not signal readiness in time. It may still start later.
    #[error("Active object '{name}' did not start within {}ms", .timeout.as_millis())]
    StartTimeout { name: String, timeout: Duration },

    /// `start` was called on an object that was already started
    #[error("Active object '{name}' has already been started")]
    AlreadyStarted { name: String },

    /// The object was stopped and cannot be (re)started or used
    #[error("Active object '{name}' is stopped")]
    Stopped { name: String },

    /// A lifecycle hook failed on the worker thread
    #[error("Active object '{name}' hook {hook} failed: {reason}")]
    Hook {
        name: String,
        hook: &'static str,
        reason: String,
    },

    /// The worker thread terminated by panicking outside message isolation
    #[error("Worker thread of '{name}' panicked: {reason}")]
    WorkerPanicked { name: String, reason: String },

    /// No reply arrived within the allotted time
    #[error("No reply received within {}ms", .0.as_millis())]
    ReplyTimeout(Duration),

    /// The message carrying the reply handle was dropped unanswered
    #[error("Reply handle dropped without an answer")]
    ReplyDropped,

    /// Invalid construction parameters
    #[error("Invalid active object configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl ActiveObjectError {
    pub fn hook(name: impl Into<String>, hook: &'static str, error: &anyhow::Error) -> Self {
        Self::Hook {
            name: name.into(),
            hook,
            reason: format!("{:#}", error),
        }
    }

    /// Whether the operation gave up waiting; the worker may still start
    /// or answer later
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::StartTimeout { .. } | Self::ReplyTimeout(_))
    }
}
