//! App - the execution layer.
//!
//! # Components
//! - **HandlerTable**: job type to handler routing, frozen before workers start
//! - **Worker**: one claim/execute/idle loop with cooperative shutdown
//! - **WorkerPool**: N workers started and stopped together
//! - **PanicReport**: turns a caught handler panic into a job error string

pub mod config;
pub mod handlers;
pub mod panic;
pub mod pool;
pub mod worker;

pub use self::config::{DEFAULT_POLL_INTERVAL, DEFAULT_QUEUE, WorkerConfig, WorkerPoolConfig};
pub use self::handlers::{FnHandler, HandlerTable, JobHandler, handler_fn};
pub use self::panic::PanicReport;
pub use self::pool::{WorkerPool, WorkerPoolError, WorkerPoolStatus};
pub use self::worker::{JobOutcome, Worker, WorkerState};
