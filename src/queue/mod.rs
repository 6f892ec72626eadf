//! Bounded Queue System
//!
//! The only structure of an active object that is mutated by more than one
//! thread. Any number of producers push, a single worker pops.
//!
//! # Usage
//!
//! ```rust
//! use active_object::queue::BoundedQueue;
//!
//! let queue = BoundedQueue::new(4).unwrap();
//! queue.push(1).unwrap();
//! queue.push(2).unwrap();
//! queue.close();
//!
//! // Closed queues reject new items but drain what they hold
//! assert!(queue.push(3).is_err());
//! assert_eq!(queue.pop(), Some(1));
//! assert_eq!(queue.pop(), Some(2));
//! assert_eq!(queue.pop(), None);
//! ```

pub mod bounded;
pub mod config;
pub mod error;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use bounded::{BoundedQueue, PushPolicy};
pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
