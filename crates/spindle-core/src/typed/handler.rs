use std::marker::PhantomData;

use async_trait::async_trait;

use super::args::JobArgs;
use crate::app::handlers::JobHandler;
use crate::domain::{HandlerError, Job};

/// Handler receiving decoded args alongside the raw job.
#[async_trait]
pub trait TypedJobHandler<T: JobArgs>: Send + Sync {
    async fn handle(&self, args: T, job: &Job) -> Result<(), HandlerError>;
}

/// Type-erases a [`TypedJobHandler`] into a [`JobHandler`].
///
/// Args that fail to decode surface as [`HandlerError::Decode`], which the
/// worker records on the job like any other handler failure.
pub struct TypedHandler<T: JobArgs, H: TypedJobHandler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: JobArgs, H: TypedJobHandler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: JobArgs, H: TypedJobHandler<T>> JobHandler for TypedHandler<T, H> {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError> {
        let args: T = job.decode_args()?;
        self.handler.handle(args, job).await
    }
}
