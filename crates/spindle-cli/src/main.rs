use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use spindle_core::{
    HandlerError, HandlerTable, InMemoryJobStore, Job, JobArgs, NewJob, RetryPolicy,
    TypedJobHandler, WorkerPool, WorkerPoolConfig,
};
use tracing_subscriber::EnvFilter;

/// How long the demo runs before shutting the pool down on its own.
const RUN_FOR: Duration = Duration::from_secs(20);

#[derive(Debug, Serialize, Deserialize)]
struct Hello {
    name: String,
}

impl JobArgs for Hello {
    const TYPE: &'static str = "hello";
}

/// Fails its first `n` runs, then greets.
struct HelloHandler {
    remaining_failures: AtomicU32,
}

impl HelloHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl TypedJobHandler<Hello> for HelloHandler {
    async fn handle(&self, args: Hello, job: &Job) -> Result<(), HandlerError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(HandlerError::failed(format!(
                "intentional failure (left={left})"
            )));
        }

        tracing::info!(job_id = %job.id, attempt = job.error_count + 1, "Hello, {}!", args.name);
        Ok(())
    }
}

fn handlers() -> Result<HandlerTable> {
    let mut table = HandlerTable::new();
    table.register_typed::<Hello, _>(HelloHandler::new(2))?;
    table.register_fn("explode", |job: Job| async move {
        if job.error_count == 0 {
            panic!("first run of job {} always explodes", job.id);
        }
        Ok(())
    })?;
    table.ensure_registered(&[Hello::TYPE, "explode"])?;
    Ok(table)
}

async fn seed(store: &InMemoryJobStore, queue: &str) -> Result<()> {
    for name in ["weaver", "spindle", "loom"] {
        let new_job = Hello { name: name.to_string() }.to_new_job()?.with_queue(queue);
        store.enqueue(new_job).await?;
    }
    store
        .enqueue(NewJob::new("explode", json!({})).with_queue(queue))
        .await?;
    // No handler: stays in the store with an "unknown job type" error.
    store
        .enqueue(NewJob::new("mystery", json!({ "note": "nobody handles this" })).with_queue(queue))
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spindle=info")),
        )
        .init();

    let config = WorkerPoolConfig::from_env().context("reading pool configuration")?;
    tracing::info!(
        workers = config.worker_count,
        queue = %config.queue,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "spindle starting"
    );

    let store = Arc::new(InMemoryJobStore::with_retry_policy(RetryPolicy::new(
        2,
        Duration::from_secs(1),
    )));
    seed(&store, &config.queue).await?;

    let pool = WorkerPool::with_config(store.clone(), Arc::new(handlers()?), config);
    pool.start().await?;

    let deadline = tokio::time::sleep(RUN_FOR);
    tokio::pin!(deadline);
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received shutdown signal");
                break;
            }
            _ = &mut deadline => {
                tracing::info!("demo time is up");
                break;
            }
            _ = ticker.tick() => {
                let counts = store.counts().await;
                tracing::debug!(?counts, "queue status");
                if counts.total == 0 {
                    tracing::info!("queue drained");
                    break;
                }
            }
        }
    }

    pool.shutdown().await;

    let counts = store.counts().await;
    tracing::info!(
        ready = counts.ready,
        scheduled = counts.scheduled,
        locked = counts.locked,
        total = counts.total,
        "spindle stopped"
    );
    Ok(())
}
