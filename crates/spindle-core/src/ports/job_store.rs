//! JobStore port - claim jobs and report their outcome.

use async_trait::async_trait;

use crate::domain::{Job, JobId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("invalid job: {0}")]
    Invalid(String),
}

/// A job claimed by one worker.
///
/// The store-side lock is held until `release` is called. `release` takes the
/// lease by value, so each claimed job can be released at most once.
#[async_trait]
pub trait JobLease: Send + Sync {
    fn job(&self) -> &Job;

    /// Record a failure on the job. The store decides when it runs again.
    async fn report_error(&self, message: &str) -> Result<(), StoreError>;

    /// Permanently remove a job that completed successfully.
    async fn delete(&self) -> Result<(), StoreError>;

    /// Free the store-side lock. Must be called whatever the outcome was.
    async fn release(self: Box<Self>) -> Result<(), StoreError>;
}

/// Job store port.
///
/// `claim` must never hand the same job to two concurrent callers, and
/// returns `Ok(None)` when the queue has nothing runnable.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn claim(&self, queue: &str) -> Result<Option<Box<dyn JobLease>>, StoreError>;
}
