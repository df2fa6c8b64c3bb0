//! HandlerTable - job type to handler routing.
//!
//! Built mutably during initialization, then frozen behind an `Arc` and read
//! concurrently by every worker without locking.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{HandlerError, Job, SpindleError};
use crate::typed::{JobArgs, TypedHandler, TypedJobHandler};

/// A handler for one job type.
///
/// Returning `Err` records the error's message on the job and leaves it for
/// the store to retry. Panics are caught by the worker and recorded the same
/// way.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError>;
}

/// Adapter turning an async closure over an owned [`Job`] into a handler.
pub struct FnHandler<F> {
    f: F,
}

/// Wrap `f` so it can be registered as a [`JobHandler`].
///
/// ```ignore
/// table.register("email.send", handler_fn(|job| async move {
///     let args: EmailArgs = job.decode_args()?;
///     send(args).await.map_err(|e| HandlerError::failed(e.to_string()))
/// }))?;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, job: &Job) -> Result<(), HandlerError> {
        (self.f)(job.clone()).await
    }
}

/// Registry of handlers (job_type -> handler).
#[derive(Default, Clone)]
pub struct HandlerTable {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a job type. Registering the same type twice is
    /// an error rather than "last wins".
    pub fn register<H: JobHandler + 'static>(
        &mut self,
        job_type: impl Into<String>,
        handler: H,
    ) -> Result<(), SpindleError> {
        self.insert(job_type.into(), Arc::new(handler))
    }

    pub fn register_fn<F, Fut>(
        &mut self,
        job_type: impl Into<String>,
        f: F,
    ) -> Result<(), SpindleError>
    where
        F: Fn(Job) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.register(job_type, handler_fn(f))
    }

    /// Register a handler whose args decode into `T`, under `T::TYPE`.
    pub fn register_typed<T, H>(&mut self, handler: H) -> Result<(), SpindleError>
    where
        T: JobArgs,
        H: TypedJobHandler<T> + 'static,
    {
        self.insert(T::TYPE.to_string(), Arc::new(TypedHandler::new(handler)))
    }

    fn insert(&mut self, job_type: String, handler: Arc<dyn JobHandler>) -> Result<(), SpindleError> {
        if self.handlers.contains_key(&job_type) {
            return Err(SpindleError::DuplicateHandler(job_type));
        }
        self.handlers.insert(job_type, handler);
        Ok(())
    }

    pub fn get(&self, job_type: &str) -> Option<&Arc<dyn JobHandler>> {
        self.handlers.get(job_type)
    }

    /// Registered job types, sorted.
    pub fn job_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Fail fast when any of `expected` has no handler.
    pub fn ensure_registered(&self, expected: &[&str]) -> Result<(), SpindleError> {
        let missing: Vec<String> = expected
            .iter()
            .filter(|job_type| !self.handlers.contains_key(**job_type))
            .map(|job_type| job_type.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SpindleError::MissingHandlers(missing))
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("job_types", &self.job_types())
            .finish()
    }
}
