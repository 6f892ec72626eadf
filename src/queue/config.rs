//! Queue Configuration Module
//!
//! Serializable queue settings, resolved through the application's
//! configuration discovery.

use serde::{Deserialize, Serialize};

use crate::queue::bounded::{BoundedQueue, PushPolicy};
use crate::queue::error::{QueueError, QueueResult};

/// Default number of message slots
pub const DEFAULT_CAPACITY: usize = 1024;

/// Main queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue capacity (number of messages)
    pub capacity: usize,

    /// Behaviour of a push against a full queue
    pub push_policy: PushPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            push_policy: PushPolicy::Block,
        }
    }
}

impl QueueConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> QueueResult<()> {
        if self.capacity == 0 {
            return Err(QueueError::InvalidCapacity(self.capacity));
        }
        Ok(())
    }

    /// Build a queue from this configuration
    pub fn build<T>(&self) -> QueueResult<BoundedQueue<T>> {
        BoundedQueue::with_policy(self.capacity, self.push_policy)
    }
}
