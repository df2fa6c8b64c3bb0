//! Typed job API.
//!
//! A payload type names its own job type through `JobArgs::TYPE`, so the
//! string used at enqueue time and at registration time cannot drift apart.

pub mod args;
pub mod handler;

pub use self::args::JobArgs;
pub use self::handler::{TypedHandler, TypedJobHandler};
