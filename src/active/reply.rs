//! Request/Reply Support
//!
//! One-shot reply slot carried inside a message, answered on the worker
//! thread and awaited by the requester.

use std::time::Duration;

use crossbeam_channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::active::error::{ActiveObjectError, ActiveResult};

/// Sending half, moved into the request message
#[derive(Debug)]
pub struct ReplySender<T> {
    sender: Sender<T>,
}

/// Receiving half, kept by the requester
#[derive(Debug)]
pub struct Reply<T> {
    receiver: Receiver<T>,
}

/// Create a connected reply pair
pub fn reply_channel<T>() -> (ReplySender<T>, Reply<T>) {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    (ReplySender { sender }, Reply { receiver })
}

impl<T> ReplySender<T> {
    /// Answer the request.
    ///
    /// Takes `&self` because behaviours only see their messages by reference.
    /// Only the first answer is delivered; returns `false` for later answers
    /// and when the requester gave up waiting.
    pub fn send(&self, value: T) -> bool {
        self.sender.try_send(value).is_ok()
    }
}

impl<T> Reply<T> {
    /// Block until the answer arrives or `timeout` elapses
    pub fn wait(self, timeout: Duration) -> ActiveResult<T> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => ActiveObjectError::ReplyTimeout(timeout),
            RecvTimeoutError::Disconnected => ActiveObjectError::ReplyDropped,
        })
    }

    /// Take the answer if it has already arrived
    pub fn try_take(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}
