//! Queue Error Types
//!
//! Defines error types specific to the bounded queue operations.

use std::time::Duration;
use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur during queue operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Queue has been closed - no further items are accepted
    #[error("Queue is closed - cannot add more messages")]
    Closed,

    /// Queue has reached its capacity limit and the push policy rejects
    #[error("Queue is full - cannot add more messages")]
    Full,

    /// A bounded wait expired before the operation could complete
    #[error("Queue operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Capacity must be at least one slot
    #[error("Invalid queue capacity: {0}")]
    InvalidCapacity(usize),
}

impl QueueError {
    /// Whether the error means the queue will never accept the item
    pub fn is_closed(&self) -> bool {
        matches!(self, QueueError::Closed)
    }
}
