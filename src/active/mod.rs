//! Active Object System
//!
//! An active object exposes an asynchronous-looking API (`post_message`) but
//! executes all work serially on one private worker thread.
//!
//! # Architecture
//!
//! - **ActiveBehavior**: what a concrete object supplies (stop sentinel,
//!   message processing, setup and teardown hooks)
//! - **MessageLoop**: receive/dispatch loop with per-message failure isolation
//! - **ActiveObject**: owns the queue and the worker thread, implements the
//!   start/stop handshake
//! - **Reply**: one-shot answers for request/reply messages
//!
//! # Usage
//!
//! ```rust
//! use active_object::active::{ActiveObject, FnBehavior};
//! use std::time::Duration;
//!
//! let behavior = FnBehavior::new(|_ctx, message: &Option<u32>| {
//!     println!("processing {:?}", message);
//!     Ok(())
//! });
//! let object = ActiveObject::new("printer", behavior).unwrap();
//!
//! assert!(object.start(Duration::from_secs(5)));
//! assert!(object.post_message(Some(1)));
//! assert!(object.post_message(Some(2)));
//! assert!(object.stop(Duration::from_secs(5)));
//!
//! assert_eq!(object.messages_processed(), 2);
//! assert!(!object.post_message(Some(3)));
//! ```

pub mod behavior;
pub mod config;
pub mod error;
pub mod lifecycle;
mod message_loop;
pub mod object;
pub mod reply;
pub mod stats;


// Re-export main types for convenience
pub use behavior::{ActiveBehavior, FnBehavior, ProcessingContext, Sentinel};
pub use config::ActiveObjectConfig;
pub use error::{ActiveObjectError, ActiveResult};
pub use lifecycle::WorkerState;
pub use object::ActiveObject;
pub use reply::{reply_channel, Reply, ReplySender};
pub use stats::ActiveObjectStats;
