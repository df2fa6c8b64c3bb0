//! Job snapshot handed to handlers, and the request used to enqueue one.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::errors::HandlerError;

/// Priority given to jobs that do not ask for one. Lower runs first.
pub const DEFAULT_PRIORITY: i16 = 100;

/// Numeric job identifier assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(i64);

impl JobId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A claimed job as seen by the worker and its handler.
///
/// This is a snapshot taken at claim time. Changes made through the lease
/// (`report_error`, `delete`) are written to the store, not back into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub queue: String,
    pub priority: i16,
    pub run_at: DateTime<Utc>,
    pub job_type: String,
    pub args: serde_json::Value,
    pub error_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Job {
    /// Decode `args` into a concrete payload type.
    pub fn decode_args<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        Ok(serde_json::from_value(self.args.clone())?)
    }
}

/// Enqueue request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub job_type: String,
    pub args: serde_json::Value,
    #[serde(default)]
    pub queue: String,
    #[serde(default = "default_priority")]
    pub priority: i16,
    /// `None` means "runnable now".
    #[serde(default)]
    pub run_at: Option<DateTime<Utc>>,
}

fn default_priority() -> i16 {
    DEFAULT_PRIORITY
}

impl NewJob {
    pub fn new(job_type: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            job_type: job_type.into(),
            args,
            queue: String::new(),
            priority: DEFAULT_PRIORITY,
            run_at: None,
        }
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn with_priority(mut self, priority: i16) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_run_at(mut self, run_at: DateTime<Utc>) -> Self {
        self.run_at = Some(run_at);
        self
    }
}
