//! Notification Event Types
//!
//! The two event kinds an active object reports outward, and the payload that
//! describes a failed message.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kinds of notification emitted by the worker thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A message was processed successfully
    MessageProcessed,
    /// Processing a message failed or panicked
    ExceptionCaught,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::MessageProcessed => write!(f, "message-processed"),
            NotificationKind::ExceptionCaught => write!(f, "exception-caught"),
        }
    }
}

/// How a message failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The processing hook returned an error
    Error,
    /// The processing hook (or a processed-observer) panicked
    Panic,
}

/// Description of a single failed message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingFailure {
    /// Name of the active object that caught the failure
    pub source: String,
    /// Position of the message in the worker's receive order (zero based)
    pub sequence: u64,
    pub kind: FailureKind,
    pub detail: String,
}

impl ProcessingFailure {
    /// Failure from an error returned by the processing hook
    pub fn from_error(source: impl Into<String>, sequence: u64, error: &anyhow::Error) -> Self {
        Self {
            source: source.into(),
            sequence,
            kind: FailureKind::Error,
            detail: format!("{:#}", error),
        }
    }

    /// Failure from a caught panic payload
    pub fn from_panic(source: impl Into<String>, sequence: u64, payload: &(dyn Any + Send)) -> Self {
        Self {
            source: source.into(),
            sequence,
            kind: FailureKind::Panic,
            detail: panic_message(payload),
        }
    }

    pub fn is_panic(&self) -> bool {
        self.kind == FailureKind::Panic
    }
}

impl fmt::Display for ProcessingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            FailureKind::Error => "failed",
            FailureKind::Panic => "panicked",
        };
        write!(f, "'{}' message #{} {}: {}", self.source, self.sequence, what, self.detail)
    }
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
