//! Notification Channel System
//!
//! Observer mechanism through which an active object reports processed
//! messages and caught failures, without depending on any specific consumer.
//!
//! # Example Usage
//!
//! ```rust
//! use active_object::notifications::{NotificationChannel, NotificationKind};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let channel = NotificationChannel::<u32>::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//! let id = channel.subscribe_processed(move |value| {
//!     counter.fetch_add(*value as usize, Ordering::Relaxed);
//! });
//!
//! channel.notify_processed(&5);
//! assert_eq!(seen.load(Ordering::Relaxed), 5);
//!
//! assert!(channel.unsubscribe(id));
//! assert_eq!(channel.subscriber_count(NotificationKind::MessageProcessed), 0);
//! ```

pub mod channel;
pub mod events;


// Re-export core types for convenience
pub use channel::{NotificationChannel, SubscriptionId};
pub use events::{FailureKind, NotificationKind, ProcessingFailure};
