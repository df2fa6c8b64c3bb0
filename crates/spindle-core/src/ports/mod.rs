//! Ports - the seams between the worker core and the outside world.
//!
//! The job store is the only collaborator the core talks to. Everything
//! about locking, retry scheduling and persistence lives behind it.

pub mod job_store;

pub use self::job_store::{JobLease, JobStore, StoreError};
