//! InMemoryJobStore - development/test implementation of the store port.
//!
//! Claim order follows the usual Postgres queue layout: lowest priority value
//! first, then earliest `run_at`, then lowest id. Select-and-lock happens
//! under one mutex, so concurrent claimers never receive the same job.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::record::JobRecord;
use super::retry::RetryPolicy;
use crate::domain::{Job, JobId, NewJob};
use crate::ports::{JobLease, JobStore, StoreError};

/// Snapshot of the store for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Due and unlocked.
    pub ready: usize,
    /// Unlocked but `run_at` is in the future (new delayed jobs and retries).
    pub scheduled: usize,
    /// Currently claimed by a worker.
    pub locked: usize,
    pub total: usize,
}

struct StoreState {
    records: BTreeMap<JobId, JobRecord>,
    next_id: i64,
}

/// In-memory job store.
///
/// Cloning is cheap and every clone sees the same jobs.
#[derive(Clone)]
pub struct InMemoryJobStore {
    state: Arc<Mutex<StoreState>>,
    retry_policy: RetryPolicy,
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::with_retry_policy(RetryPolicy::default())
    }

    pub fn with_retry_policy(retry_policy: RetryPolicy) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                records: BTreeMap::new(),
                next_id: 1,
            })),
            retry_policy,
        }
    }

    pub async fn enqueue(&self, new_job: NewJob) -> Result<Job, StoreError> {
        if new_job.job_type.trim().is_empty() {
            return Err(StoreError::Invalid("job_type must not be empty".to_string()));
        }

        let mut state = self.state.lock().await;
        let id = JobId::new(state.next_id);
        state.next_id += 1;

        let job = Job {
            id,
            queue: new_job.queue,
            priority: new_job.priority,
            run_at: new_job.run_at.unwrap_or_else(Utc::now),
            job_type: new_job.job_type,
            args: new_job.args,
            error_count: 0,
            last_error: None,
        };
        state.records.insert(id, JobRecord::new(job.clone()));
        debug!(job_id = %id, job_type = %job.job_type, queue = %job.queue, "job enqueued");
        Ok(job)
    }

    pub async fn get(&self, id: JobId) -> Option<Job> {
        self.state.lock().await.records.get(&id).map(|r| r.job.clone())
    }

    pub async fn is_locked(&self, id: JobId) -> bool {
        self.state
            .lock()
            .await
            .records
            .get(&id)
            .is_some_and(|r| r.locked)
    }

    pub async fn counts(&self) -> QueueCounts {
        let state = self.state.lock().await;
        let now = Utc::now();
        let mut counts = QueueCounts {
            total: state.records.len(),
            ..Default::default()
        };
        for record in state.records.values() {
            if record.locked {
                counts.locked += 1;
            } else if record.job.run_at <= now {
                counts.ready += 1;
            } else {
                counts.scheduled += 1;
            }
        }
        counts
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.records.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn claim(&self, queue: &str) -> Result<Option<Box<dyn JobLease>>, StoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let Some(record) = state
            .records
            .values_mut()
            .filter(|r| r.is_claimable(queue, now))
            .min_by_key(|r| r.claim_key())
        else {
            return Ok(None);
        };

        record.lock();
        Ok(Some(Box::new(MemoryLease {
            job: record.job.clone(),
            state: Arc::clone(&self.state),
            retry_policy: self.retry_policy.clone(),
        })))
    }
}

struct MemoryLease {
    job: Job,
    state: Arc<Mutex<StoreState>>,
    retry_policy: RetryPolicy,
}

fn run_at_after(now: DateTime<Utc>, delay: std::time::Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
impl JobLease for MemoryLease {
    fn job(&self) -> &Job {
        &self.job
    }

    async fn report_error(&self, message: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let record = state
            .records
            .get_mut(&self.job.id)
            .ok_or(StoreError::JobNotFound(self.job.id))?;

        let delay = self
            .retry_policy
            .delay(record.job.error_count.saturating_add(1));
        record.record_error(message, run_at_after(Utc::now(), delay));
        debug!(
            job_id = %self.job.id,
            error_count = record.job.error_count,
            retry_in_secs = delay.as_secs(),
            "job error recorded"
        );
        Ok(())
    }

    async fn delete(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state
            .records
            .remove(&self.job.id)
            .map(|_| ())
            .ok_or(StoreError::JobNotFound(self.job.id))
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(record) = state.records.get_mut(&self.job.id) {
            record.unlock();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;

    async fn claim_id(store: &InMemoryJobStore, queue: &str) -> Option<JobId> {
        let lease = store.claim(queue).await.unwrap()?;
        let id = lease.job().id;
        lease.release().await.unwrap();
        Some(id)
    }

    #[tokio::test]
    async fn enqueue_assigns_increasing_ids() {
        let store = InMemoryJobStore::new();
        let a = store.enqueue(NewJob::new("a", json!({}))).await.unwrap();
        let b = store.enqueue(NewJob::new("b", json!({}))).await.unwrap();

        assert!(a.id < b.id);
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get(b.id).await.unwrap().job_type, "b");
    }

    #[tokio::test]
    async fn enqueue_rejects_empty_type() {
        let store = InMemoryJobStore::new();
        let err = store.enqueue(NewJob::new("  ", json!({}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn claim_prefers_priority_then_age() {
        let store = InMemoryJobStore::new();
        let earlier = Utc::now() - chrono::Duration::seconds(60);
        let low = store
            .enqueue(NewJob::new("t", json!({})).with_priority(200))
            .await
            .unwrap();
        let normal = store.enqueue(NewJob::new("t", json!({}))).await.unwrap();
        let old = store
            .enqueue(NewJob::new("t", json!({})).with_run_at(earlier))
            .await
            .unwrap();
        let urgent = store
            .enqueue(NewJob::new("t", json!({})).with_priority(1))
            .await
            .unwrap();

        let mut order = Vec::new();
        while let Some(lease) = store.claim("").await.unwrap() {
            order.push(lease.job().id);
            lease.delete().await.unwrap();
            lease.release().await.unwrap();
        }
        assert_eq!(order, vec![urgent.id, old.id, normal.id, low.id]);
    }

    #[tokio::test]
    async fn claim_is_scoped_to_queue() {
        let store = InMemoryJobStore::new();
        let email = store
            .enqueue(NewJob::new("t", json!({})).with_queue("email"))
            .await
            .unwrap();

        assert_eq!(claim_id(&store, "").await, None);
        assert_eq!(claim_id(&store, "email").await, Some(email.id));
    }

    #[tokio::test]
    async fn future_jobs_are_not_claimable() {
        let store = InMemoryJobStore::new();
        store
            .enqueue(NewJob::new("t", json!({})).with_run_at(Utc::now() + chrono::Duration::hours(1)))
            .await
            .unwrap();

        assert!(store.claim("").await.unwrap().is_none());
        assert_eq!(store.counts().await.scheduled, 1);
    }

    #[tokio::test]
    async fn locked_job_is_not_claimed_twice_until_released() {
        let store = InMemoryJobStore::new();
        let job = store.enqueue(NewJob::new("t", json!({}))).await.unwrap();

        let lease = store.claim("").await.unwrap().unwrap();
        assert!(store.is_locked(job.id).await);
        assert!(store.claim("").await.unwrap().is_none());
        assert_eq!(store.counts().await.locked, 1);

        lease.release().await.unwrap();
        assert!(!store.is_locked(job.id).await);
        assert_eq!(claim_id(&store, "").await, Some(job.id));
    }

    #[tokio::test]
    async fn report_error_backs_off_and_keeps_job() {
        let store = InMemoryJobStore::with_retry_policy(RetryPolicy::new(1, Duration::from_secs(60)));
        let job = store.enqueue(NewJob::new("t", json!({}))).await.unwrap();

        let lease = store.claim("").await.unwrap().unwrap();
        lease.report_error("boom").await.unwrap();
        lease.release().await.unwrap();

        let stored = store.get(job.id).await.unwrap();
        assert_eq!(stored.error_count, 1);
        assert_eq!(stored.last_error.as_deref(), Some("boom"));
        assert!(stored.run_at >= Utc::now() + chrono::Duration::seconds(55));
        assert!(store.claim("").await.unwrap().is_none());
        assert_eq!(
            store.counts().await,
            QueueCounts {
                ready: 0,
                scheduled: 1,
                locked: 0,
                total: 1
            }
        );
    }

    #[tokio::test]
    async fn delete_removes_and_release_still_succeeds() {
        let store = InMemoryJobStore::new();
        let job = store.enqueue(NewJob::new("t", json!({}))).await.unwrap();

        let lease = store.claim("").await.unwrap().unwrap();
        lease.delete().await.unwrap();
        assert!(matches!(
            lease.report_error("late").await,
            Err(StoreError::JobNotFound(id)) if id == job.id
        ));
        lease.release().await.unwrap();

        assert!(store.get(job.id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_never_share_a_job() {
        let store = InMemoryJobStore::new();
        for _ in 0..50 {
            store.enqueue(NewJob::new("t", json!({}))).await.unwrap();
        }

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let mut claimed = Vec::new();
                // Leases are kept (not released) so each job can only be claimed once.
                let mut held = Vec::new();
                while let Some(lease) = store.claim("").await.unwrap() {
                    claimed.push(lease.job().id);
                    held.push(lease);
                }
                claimed
            }));
        }

        let mut seen = HashSet::new();
        for task in tasks {
            for id in task.await.unwrap() {
                assert!(seen.insert(id), "job {id} claimed twice");
            }
        }
        assert_eq!(seen.len(), 50);
    }
}
