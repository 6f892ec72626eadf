//! Active Object Thread Owner
//!
//! Binds a behaviour to one dedicated worker thread and implements the
//! start/stop handshake.
//!
//! Stopping is graceful: the stop sentinel travels through the same queue as
//! ordinary messages, so everything posted before `stop` is processed before
//! the worker exits. The queue is closed right after the sentinel is queued.
//!
//! # Hazards
//!
//! - A `start` that times out does not retract the spawned thread. The worker
//!   may still reach `Running` later; `stop` remains the way to end it.
//! - A `stop` that times out has already queued the sentinel and closed the
//!   queue. Use `wait_for_exit` to observe the eventual exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::active::behavior::ActiveBehavior;
use crate::active::config::ActiveObjectConfig;
use crate::active::error::{ActiveObjectError, ActiveResult};
use crate::active::lifecycle::{WorkerState, WorkerStatus};
use crate::active::message_loop::MessageLoop;
use crate::active::reply::{reply_channel, ReplySender};
use crate::active::stats::{ActiveObjectStats, Counters};
use crate::notifications::events::panic_message;
use crate::notifications::NotificationChannel;
use crate::queue::{BoundedQueue, QueueError, QueueResult};

/// State shared between the owner, producers and the worker thread
pub(crate) struct Shared<M> {
    pub(crate) name: String,
    pub(crate) queue: BoundedQueue<M>,
    pub(crate) notifications: NotificationChannel<M>,
    pub(crate) counters: Counters,
    pub(crate) status: WorkerStatus,
    /// Set by the worker once `before_process_messages` has succeeded
    pub(crate) started: AtomicBool,
}

type Worker = JoinHandle<ActiveResult<()>>;

/// An object whose messages are processed serially on a private thread
pub struct ActiveObject<B: ActiveBehavior> {
    shared: Arc<Shared<B::Message>>,
    config: ActiveObjectConfig,
    behavior: Mutex<Option<B>>,
    worker: Mutex<Option<Worker>>,
    launched: AtomicBool,
    stopped: AtomicBool,
}

impl<B: ActiveBehavior> ActiveObject<B> {
    /// Create a dormant active object with default settings
    pub fn new(name: impl Into<String>, behavior: B) -> ActiveResult<Self> {
        Self::with_config(ActiveObjectConfig::named(name), behavior)
    }

    /// Create a dormant active object from explicit settings
    pub fn with_config(config: ActiveObjectConfig, behavior: B) -> ActiveResult<Self> {
        config.validate()?;
        let queue = config.queue.build()?;
        let shared = Arc::new(Shared {
            name: config.name.clone(),
            queue,
            notifications: NotificationChannel::new(),
            counters: Counters::default(),
            status: WorkerStatus::new(),
            started: AtomicBool::new(false),
        });

        Ok(Self {
            shared,
            config,
            behavior: Mutex::new(Some(behavior)),
            worker: Mutex::new(None),
            launched: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &ActiveObjectConfig {
        &self.config
    }

    /// Observers of processed messages and caught failures
    pub fn notifications(&self) -> &NotificationChannel<B::Message> {
        &self.shared.notifications
    }

    /// Start the worker and wait up to `timeout` for it to become ready.
    ///
    /// Returns `true` only if the worker ran `before_process_messages`
    /// successfully within the timeout.
    pub fn start(&self, timeout: Duration) -> bool {
        match self.launch(timeout) {
            Ok(()) => true,
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }

    /// `start` with the configured start timeout
    pub fn start_default(&self) -> bool {
        self.start(self.config.start_timeout())
    }

    /// Start the worker, reporting why a start failed.
    ///
    /// On `StartTimeout` the thread keeps running and may still become ready.
    pub fn launch(&self, timeout: Duration) -> ActiveResult<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(ActiveObjectError::Stopped {
                name: self.shared.name.clone(),
            });
        }
        if self.launched.swap(true, Ordering::SeqCst) {
            return Err(ActiveObjectError::AlreadyStarted {
                name: self.shared.name.clone(),
            });
        }
        let behavior = self
            .behavior
            .lock()
            .take()
            .ok_or_else(|| ActiveObjectError::AlreadyStarted {
                name: self.shared.name.clone(),
            })?;

        info!("Starting active object '{}'", self.shared.name);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(self.shared.name.clone())
            .spawn(move || MessageLoop::new(shared, behavior).run())
            .map_err(|source| {
                self.abandon_launch();
                ActiveObjectError::Spawn {
                    name: self.shared.name.clone(),
                    source,
                }
            })?;
        *self.worker.lock() = Some(handle);

        let observed = self.shared.status.wait_until_ready(timeout);
        if self.shared.started.load(Ordering::SeqCst) {
            debug!("Active object '{}' started ({})", self.shared.name, observed);
            return Ok(());
        }

        if observed == WorkerState::Exited {
            // Setup failed and the worker is gone: surface its error
            return Err(self.reap().unwrap_or_else(|| ActiveObjectError::Hook {
                name: self.shared.name.clone(),
                hook: "before_process_messages",
                reason: "worker exited before becoming ready".to_string(),
            }));
        }

        Err(ActiveObjectError::StartTimeout {
            name: self.shared.name.clone(),
            timeout,
        })
    }

    /// Retire an object whose worker could not be spawned.
    ///
    /// The behaviour went down with the spawn closure, so the object can never
    /// run: it is marked stopped and its queue closed.
    pub(crate) fn abandon_launch(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.launched.store(false, Ordering::SeqCst);
        self.shared.queue.close();
    }

    /// Request a graceful stop and wait up to `timeout` for the worker to exit.
    ///
    /// Only the first call performs the sentinel/close sequence; later and
    /// concurrent calls return `true` immediately.
    pub fn stop(&self, timeout: Duration) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return true;
        }
        info!("Stopping active object '{}'", self.shared.name);
        if !self.launched.load(Ordering::SeqCst) {
            self.shared.queue.close();
            return true;
        }
        let deadline = Instant::now().checked_add(timeout);

        // Sentinel goes through the ordinary push path, after everything
        // already queued. If it cannot get in before the deadline the close
        // below still ends the loop once the queue is drained.
        match self.shared.queue.push_timeout(B::stop_message(), timeout) {
            Ok(()) => {}
            Err(QueueError::Closed) => debug!("Queue of '{}' already closed", self.shared.name),
            Err(e) => warn!("Stop message for '{}' not queued: {}", self.shared.name, e),
        }
        self.shared.queue.close();

        let remaining = deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(timeout);
        self.wait_for_exit(remaining)
    }

    /// `stop` with the configured stop timeout
    pub fn stop_default(&self) -> bool {
        self.stop(self.config.stop_timeout())
    }

    /// Wait up to `timeout` for the worker thread to exit, reaping it if so.
    ///
    /// Returns `true` immediately when no worker was ever started.
    pub fn wait_for_exit(&self, timeout: Duration) -> bool {
        if !self.launched.load(Ordering::SeqCst) {
            return true;
        }
        if self.is_worker_thread() {
            warn!(
                "Active object '{}' cannot wait for its own worker thread",
                self.shared.name
            );
            return false;
        }
        if !self.shared.status.wait_for_exit(timeout) {
            warn!(
                "Active object '{}' did not exit within {}ms",
                self.shared.name,
                timeout.as_millis()
            );
            return false;
        }
        if let Some(e) = self.reap() {
            debug!("Worker of '{}' ended with: {}", self.shared.name, e);
        }
        true
    }

    /// Id of the worker thread, until it has been reaped
    pub fn worker_thread_id(&self) -> Option<ThreadId> {
        self.worker.lock().as_ref().map(|handle| handle.thread().id())
    }

    fn is_worker_thread(&self) -> bool {
        self.worker_thread_id() == Some(thread::current().id())
    }

    /// Join an exited worker and return its failure, if any
    fn reap(&self) -> Option<ActiveObjectError> {
        let handle = self.worker.lock().take()?;
        match handle.join() {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(payload) => Some(ActiveObjectError::WorkerPanicked {
                name: self.shared.name.clone(),
                reason: panic_message(payload.as_ref()),
            }),
        }
    }

    /// Queue a message for the worker, blocking while the queue is full
    /// under the blocking policy.
    ///
    /// Returns `false` once the object is shutting down; callers should stop
    /// producing rather than retry.
    pub fn post_message(&self, message: B::Message) -> bool {
        self.post(message).is_ok()
    }

    /// `post_message`, reporting why the message was not queued.
    ///
    /// `Full` is only possible under `PushPolicy::Reject`.
    pub fn post(&self, message: B::Message) -> QueueResult<()> {
        self.post_with(|queue| queue.push(message))
    }

    /// Queue a message without ever blocking
    pub fn try_post_message(&self, message: B::Message) -> QueueResult<()> {
        self.post_with(|queue| queue.try_push(message))
    }

    fn post_with(
        &self,
        push: impl FnOnce(&BoundedQueue<B::Message>) -> QueueResult<()>,
    ) -> QueueResult<()> {
        // No logging on this path: the asynchronous logger posts through it
        let counters = &self.shared.counters;
        counters.reserve_post();
        let result = push(&self.shared.queue);
        if result.is_err() {
            counters.cancel_post();
        }
        result
    }

    /// Post a message carrying a reply handle and wait for the answer.
    ///
    /// Fails with `Stopped` once the object is shutting down and with
    /// `Queue(Full)` when a rejecting queue has no room.
    pub fn request<T>(
        &self,
        build: impl FnOnce(ReplySender<T>) -> B::Message,
        timeout: Duration,
    ) -> ActiveResult<T> {
        let (sender, reply) = reply_channel();
        self.post(build(sender)).map_err(|e| match e {
            QueueError::Closed => ActiveObjectError::Stopped {
                name: self.shared.name.clone(),
            },
            other => ActiveObjectError::Queue(other),
        })?;
        reply.wait(timeout)
    }

    /// Whether the worker has signalled readiness
    pub fn is_started(&self) -> bool {
        self.shared.started.load(Ordering::SeqCst)
    }

    /// Whether `stop` has been requested
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> WorkerState {
        self.shared.status.current()
    }

    pub fn messages_posted(&self) -> u64 {
        self.shared.counters.posted()
    }

    pub fn messages_processed(&self) -> u64 {
        self.shared.counters.processed()
    }

    pub fn messages_failed(&self) -> u64 {
        self.shared.counters.failed()
    }

    pub fn stats(&self) -> ActiveObjectStats {
        let counters = &self.shared.counters;
        ActiveObjectStats {
            name: self.shared.name.clone(),
            state: self.state(),
            started: self.is_started(),
            stopped: self.is_stopped(),
            // Reverse of the increment order: failed <= processed <= posted
            messages_failed: counters.failed(),
            messages_processed: counters.processed(),
            messages_posted: counters.posted(),
            queued: self.shared.queue.len(),
            capacity: self.shared.queue.capacity(),
        }
    }
}

impl<B: ActiveBehavior> Drop for ActiveObject<B> {
    fn drop(&mut self) {
        if !self.launched.load(Ordering::SeqCst) {
            self.shared.queue.close();
            return;
        }
        if !self.stopped.load(Ordering::SeqCst) {
            warn!(
                "Active object '{}' dropped while running, stopping it",
                self.shared.name
            );
            if !self.stop(self.config.stop_timeout()) {
                error!(
                    "Active object '{}' worker detached after stop timeout",
                    self.shared.name
                );
            }
        } else if self.state() == WorkerState::Exited {
            self.reap();
        } else if self.worker.lock().is_some() {
            debug!("Detaching worker of '{}'", self.shared.name);
        }
    }
}

impl<B: ActiveBehavior> std::fmt::Debug for ActiveObject<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveObject")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("queue", &self.shared.queue)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
