//! WorkerPool - a fixed fleet of workers sharing one configuration.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::config::WorkerPoolConfig;
use super::handlers::HandlerTable;
use super::worker::Worker;
use crate::ports::JobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPoolStatus {
    /// Constructed, workers not yet spawned.
    Created,
    Running,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerPoolError {
    #[error("worker pool is already running")]
    AlreadyRunning,

    /// Pools are single-use: one `start`/`shutdown` pair.
    #[error("worker pool has been shut down")]
    AlreadyStopped,
}

struct PoolInner {
    status: WorkerPoolStatus,
    /// One slot per worker, empty until `start`.
    workers: Vec<Option<Arc<Worker>>>,
    joins: Vec<JoinHandle<()>>,
}

/// Pool of workers polling the same queue with the same handlers.
///
/// # Example
///
/// ```ignore
/// let pool = WorkerPool::new(store, Arc::new(handlers), 4)
///     .with_queue("emails")
///     .with_poll_interval(Duration::from_secs(1));
///
/// pool.start().await?;
/// // ...
/// pool.shutdown().await;
/// ```
pub struct WorkerPool {
    store: Arc<dyn JobStore>,
    handlers: Arc<HandlerTable>,
    config: WorkerPoolConfig,
    inner: Mutex<PoolInner>,
}

impl WorkerPool {
    pub fn new(store: Arc<dyn JobStore>, handlers: Arc<HandlerTable>, worker_count: usize) -> Self {
        Self::with_config(store, handlers, WorkerPoolConfig::new(worker_count))
    }

    pub fn with_config(
        store: Arc<dyn JobStore>,
        handlers: Arc<HandlerTable>,
        config: WorkerPoolConfig,
    ) -> Self {
        let workers = vec![None; config.worker_count];
        Self {
            store,
            handlers,
            config,
            inner: Mutex::new(PoolInner {
                status: WorkerPoolStatus::Created,
                workers,
                joins: Vec::new(),
            }),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.config.queue = queue.into();
        self
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    pub async fn status(&self) -> WorkerPoolStatus {
        self.inner.lock().await.status
    }

    /// Spawn every worker on its own task. Returns once they are spawned.
    pub async fn start(&self) -> Result<(), WorkerPoolError> {
        let mut inner = self.inner.lock().await;
        match inner.status {
            WorkerPoolStatus::Running => return Err(WorkerPoolError::AlreadyRunning),
            WorkerPoolStatus::Stopped => return Err(WorkerPoolError::AlreadyStopped),
            WorkerPoolStatus::Created => {}
        }

        info!(
            workers = self.config.worker_count,
            queue = %self.config.queue,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            job_types = ?self.handlers.job_types(),
            "starting worker pool"
        );

        let PoolInner { workers, joins, .. } = &mut *inner;
        for (index, slot) in workers.iter_mut().enumerate() {
            let worker = Arc::new(
                Worker::new(
                    Arc::clone(&self.store),
                    Arc::clone(&self.handlers),
                    self.config.worker_config(),
                )
                .with_id(format!("worker-{index}")),
            );
            *slot = Some(Arc::clone(&worker));
            joins.push(tokio::spawn(async move { worker.work().await }));
        }

        inner.status = WorkerPoolStatus::Running;
        Ok(())
    }

    /// Stop every worker and wait until all of their loops have exited.
    ///
    /// Safe to call before `start` and more than once.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if inner.status == WorkerPoolStatus::Stopped {
            return;
        }

        info!(workers = inner.workers.len(), "shutting down worker pool");

        futures::future::join_all(inner.workers.iter().flatten().map(|worker| worker.shutdown()))
            .await;

        for join in inner.joins.drain(..) {
            if let Err(err) = join.await {
                error!(error = %err, "worker task ended abnormally");
            }
        }

        inner.status = WorkerPoolStatus::Stopped;
        info!("worker pool stopped");
    }
}
