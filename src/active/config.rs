//! Active object configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::active::error::{ActiveObjectError, ActiveResult};
use crate::queue::QueueConfig;

/// Default time `start` waits for the ready handshake
pub const DEFAULT_START_TIMEOUT_MS: u64 = 5_000;
/// Default time `stop` (and drop) waits for the worker to exit
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 10_000;

/// Settings for one active object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveObjectConfig {
    /// Diagnostic name, also used as the worker thread name
    pub name: String,

    #[serde(flatten)]
    pub queue: QueueConfig,

    pub start_timeout_ms: u64,
    pub stop_timeout_ms: u64,
}

impl Default for ActiveObjectConfig {
    fn default() -> Self {
        Self {
            name: "active-object".to_string(),
            queue: QueueConfig::default(),
            start_timeout_ms: DEFAULT_START_TIMEOUT_MS,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
        }
    }
}

impl ActiveObjectConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.queue.capacity = capacity;
        self
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ActiveResult<()> {
        if self.name.trim().is_empty() {
            return Err(ActiveObjectError::InvalidConfig("name must not be empty".to_string()));
        }
        // Thread names cannot contain interior NUL bytes
        if self.name.contains('\0') {
            return Err(ActiveObjectError::InvalidConfig(format!(
                "name {:?} contains a NUL byte",
                self.name
            )));
        }
        self.queue.validate()?;
        Ok(())
    }
}
