//! Worker - a single claim/execute/idle loop.
//!
//! A worker holds at most one claimed job at a time. After a productive
//! iteration it polls again straight away; after an empty one it waits for
//! the poll interval or a stop request, whichever comes first.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::config::WorkerConfig;
use super::handlers::HandlerTable;
use super::panic::PanicReport;
use crate::ports::{JobLease, JobStore};

/// Lifecycle of a worker. Transitions only move forward:
/// `Created -> Running -> Stopping -> Stopped`, or `Created -> Stopped` when
/// shut down before it ever ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl WorkerState {
    pub fn is_stop_requested(self) -> bool {
        matches!(self, WorkerState::Stopping | WorkerState::Stopped)
    }
}

/// How a claimed job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Handler returned `Ok`; the job was deleted.
    Succeeded,
    /// Handler returned `Err`; the message was recorded on the job.
    Failed,
    /// No handler for the job type; an error was recorded on the job.
    UnknownType,
    /// Handler panicked; the panic report was recorded on the job.
    Panicked,
}

pub struct Worker {
    id: String,
    store: Arc<dyn JobStore>,
    handlers: Arc<HandlerTable>,
    config: WorkerConfig,
    state: watch::Sender<WorkerState>,
}

impl Worker {
    pub fn new(store: Arc<dyn JobStore>, handlers: Arc<HandlerTable>, config: WorkerConfig) -> Self {
        let (state, _) = watch::channel(WorkerState::Created);
        Self {
            id: "worker".to_string(),
            store,
            handlers,
            config,
            state,
        }
    }

    /// Name used in log records.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Run the polling loop until [`shutdown`](Self::shutdown) is called.
    ///
    /// Only the first call runs the loop; later calls (or a call after
    /// shutdown) return immediately.
    pub async fn work(&self) {
        let started = self.state.send_if_modified(|state| {
            if *state == WorkerState::Created {
                *state = WorkerState::Running;
                true
            } else {
                false
            }
        });
        if !started {
            warn!(worker_id = %self.id, state = ?self.state(), "worker cannot be started");
            return;
        }

        let _stopped = MarkStoppedOnExit(&self.state);
        let mut signal = self.state.subscribe();

        info!(
            worker_id = %self.id,
            queue = %self.config.queue,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "worker started"
        );

        loop {
            if self.work_one().await {
                // Work was found: only a pending stop request ends the loop.
                let state = *signal.borrow_and_update();
                if state.is_stop_requested() {
                    break;
                }
            } else {
                tokio::select! {
                    _ = wait_until(&mut signal, WorkerState::is_stop_requested) => break,
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }

        info!(worker_id = %self.id, "worker done");
    }

    /// Claim and execute at most one job. Returns whether a job was claimed.
    ///
    /// Nothing escapes this call: claim errors count as an empty poll, and
    /// handler errors and panics are recorded on the job.
    pub async fn work_one(&self) -> bool {
        let lease = match self.store.claim(&self.config.queue).await {
            Ok(Some(lease)) => lease,
            Ok(None) => return false,
            Err(err) => {
                warn!(
                    worker_id = %self.id,
                    queue = %self.config.queue,
                    error = %err,
                    "attempting to lock job"
                );
                return false;
            }
        };

        let outcome = self.perform(lease.as_ref()).await;
        let job_id = lease.job().id;
        debug!(worker_id = %self.id, %job_id, ?outcome, "job finished");

        if let Err(err) = lease.release().await {
            warn!(worker_id = %self.id, %job_id, error = %err, "attempting to release job");
        }
        true
    }

    /// Route a claimed job to its handler and record the result on the lease.
    /// The caller keeps ownership of the lease and releases it afterwards.
    pub async fn perform(&self, lease: &dyn JobLease) -> JobOutcome {
        let job = lease.job();

        let Some(handler) = self.handlers.get(&job.job_type) else {
            let message = format!("unknown job type: {:?}", job.job_type);
            warn!(worker_id = %self.id, job_id = %job.id, job_type = %job.job_type, "{message}");
            self.record_error(lease, &message).await;
            return JobOutcome::UnknownType;
        };

        match AssertUnwindSafe(handler.handle(job)).catch_unwind().await {
            Ok(Ok(())) => {
                if let Err(err) = lease.delete().await {
                    warn!(worker_id = %self.id, job_id = %job.id, error = %err, "attempting to delete job");
                }
                info!(event = "job_worked", job_id = %job.id, job_type = %job.job_type);
                JobOutcome::Succeeded
            }
            Ok(Err(handler_err)) => {
                let message = handler_err.to_string();
                debug!(worker_id = %self.id, job_id = %job.id, job_type = %job.job_type, error = %message, "handler failed");
                self.record_error(lease, &message).await;
                JobOutcome::Failed
            }
            Err(payload) => {
                let report = PanicReport::capture(payload);
                error!(
                    event = "panic",
                    job_id = %job.id,
                    job_type = %job.job_type,
                    "{report}"
                );
                self.record_error(lease, &report.to_string()).await;
                JobOutcome::Panicked
            }
        }
    }

    async fn record_error(&self, lease: &dyn JobLease, message: &str) {
        if let Err(err) = lease.report_error(message).await {
            warn!(
                worker_id = %self.id,
                job_id = %lease.job().id,
                job_error = %message,
                error = %err,
                "attempting to save error on job"
            );
        }
    }

    /// Ask the loop to stop after its current job and wait until it has.
    ///
    /// There is no timeout on the in-flight job. Calling this again, or on a
    /// worker that never ran, returns without blocking.
    pub async fn shutdown(&self) {
        let mut signal = self.state.subscribe();
        let mut previous = WorkerState::Created;
        self.state.send_modify(|state| {
            previous = *state;
            *state = match *state {
                WorkerState::Created => WorkerState::Stopped,
                WorkerState::Running => WorkerState::Stopping,
                other => other,
            };
        });

        match previous {
            WorkerState::Created => {
                debug!(worker_id = %self.id, "worker stopped before it started");
            }
            WorkerState::Stopped => {}
            WorkerState::Running | WorkerState::Stopping => {
                if previous == WorkerState::Running {
                    info!(worker_id = %self.id, "worker shutting down gracefully...");
                }
                wait_until(&mut signal, |state| state == WorkerState::Stopped).await;
            }
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

/// Publishes `Stopped` when the loop exits, including by panic or by the
/// loop's future being dropped.
struct MarkStoppedOnExit<'a>(&'a watch::Sender<WorkerState>);

impl Drop for MarkStoppedOnExit<'_> {
    fn drop(&mut self) {
        self.0.send_replace(WorkerState::Stopped);
    }
}

async fn wait_until(signal: &mut watch::Receiver<WorkerState>, done: impl Fn(WorkerState) -> bool) {
    loop {
        let state = *signal.borrow_and_update();
        if done(state) {
            return;
        }
        if signal.changed().await.is_err() {
            return;
        }
    }
}
