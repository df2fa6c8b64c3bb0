//! spindle-core
//!
//! Worker machinery for a durable job queue: claim a job from the store,
//! route it to a handler by job type, record the outcome back on the store,
//! and stop cleanly when asked.
//!
//! # Modules
//! - **domain**: job snapshot, ids, error types
//! - **ports**: the `JobStore` / `JobLease` seam
//! - **app**: handler table, worker loop, worker pool, configuration
//! - **typed**: payload types bound to job type names
//! - **impls**: in-memory job store for development and tests
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(InMemoryJobStore::new());
//!
//! let mut handlers = HandlerTable::new();
//! handlers.register_fn("email.send", |job| async move {
//!     let args: EmailArgs = job.decode_args()?;
//!     deliver(args).await.map_err(|e| HandlerError::failed(e.to_string()))
//! })?;
//!
//! let pool = WorkerPool::new(store.clone(), Arc::new(handlers), 4);
//! pool.start().await?;
//! // ...
//! pool.shutdown().await;
//! ```

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{
    HandlerTable, JobHandler, JobOutcome, Worker, WorkerConfig, WorkerPool, WorkerPoolConfig,
    WorkerPoolError, WorkerPoolStatus, WorkerState, handler_fn,
};
pub use domain::{HandlerError, Job, JobId, NewJob, SpindleError};
pub use impls::{InMemoryJobStore, QueueCounts, RetryPolicy};
pub use ports::{JobLease, JobStore, StoreError};
pub use typed::{JobArgs, TypedJobHandler};
