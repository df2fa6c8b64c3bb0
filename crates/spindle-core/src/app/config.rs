//! Worker and pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::SpindleError;

/// Idle wait between empty polls when nothing overrides it.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// The unnamed queue.
pub const DEFAULT_QUEUE: &str = "";

pub const ENV_WORKERS: &str = "SPINDLE_WORKERS";
pub const ENV_POLL_INTERVAL_MS: &str = "SPINDLE_POLL_INTERVAL_MS";
pub const ENV_QUEUE: &str = "SPINDLE_QUEUE";

/// Configuration of a single [`Worker`](super::Worker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// How long to wait after a poll that found nothing.
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,

    /// Queue the worker claims jobs from.
    pub queue: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            queue: DEFAULT_QUEUE.to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }
}

/// Configuration of a [`WorkerPool`](super::WorkerPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Number of workers started by the pool.
    pub worker_count: usize,

    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,

    pub queue: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            poll_interval: DEFAULT_POLL_INTERVAL,
            queue: DEFAULT_QUEUE.to_string(),
        }
    }
}

impl WorkerPoolConfig {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Config handed to each worker of the pool.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            poll_interval: self.poll_interval,
            queue: self.queue.clone(),
        }
    }

    /// Read overrides from `SPINDLE_WORKERS`, `SPINDLE_POLL_INTERVAL_MS` and
    /// `SPINDLE_QUEUE`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, SpindleError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SpindleError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_WORKERS) {
            config.worker_count = raw
                .trim()
                .parse()
                .map_err(|e| SpindleError::Config(format!("{ENV_WORKERS}={raw:?}: {e}")))?;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|e| SpindleError::Config(format!("{ENV_POLL_INTERVAL_MS}={raw:?}: {e}")))?;
            config.poll_interval = Duration::from_millis(millis);
        }
        if let Some(queue) = lookup(ENV_QUEUE) {
            config.queue = queue;
        }

        Ok(config)
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
