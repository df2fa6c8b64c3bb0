//! Domain model (job identifiers, job snapshots, error types).
//!
//! The store owns job records; the core only ever sees the snapshot a lease
//! hands out.

pub mod errors;
pub mod job;

pub use self::errors::{HandlerError, SpindleError};
pub use self::job::{DEFAULT_PRIORITY, Job, JobId, NewJob};
