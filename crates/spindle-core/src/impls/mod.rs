//! Impls - port implementations for development and tests.
//!
//! # Included
//! - **InMemoryJobStore**: `JobStore` backed by a mutex-guarded map
//! - **RetryPolicy**: backoff used by the in-memory store when a job errors
//!
//! Production stores (Postgres and friends) live outside this crate and only
//! need to implement `ports::JobStore`.

pub mod memory_store;
mod record;
pub mod retry;

pub use self::memory_store::{InMemoryJobStore, QueueCounts};
pub use self::retry::RetryPolicy;
