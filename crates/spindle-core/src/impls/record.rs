//! Job record: the job plus its lock flag.

use chrono::{DateTime, Utc};

use crate::domain::Job;

/// Single source of truth for one job inside the in-memory store.
#[derive(Debug, Clone)]
pub(crate) struct JobRecord {
    pub job: Job,
    pub locked: bool,
}

impl JobRecord {
    pub fn new(job: Job) -> Self {
        Self { job, locked: false }
    }

    /// Eligible for claim from `queue` at `now`?
    pub fn is_claimable(&self, queue: &str, now: DateTime<Utc>) -> bool {
        !self.locked && self.job.queue == queue && self.job.run_at <= now
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Record a failure and push the next run out to `next_run_at`.
    pub fn record_error(&mut self, message: &str, next_run_at: DateTime<Utc>) {
        self.job.error_count = self.job.error_count.saturating_add(1);
        self.job.last_error = Some(message.to_string());
        self.job.run_at = next_run_at;
    }

    /// Sort key for claim order: priority, then due time, then id.
    pub fn claim_key(&self) -> (i16, DateTime<Utc>, crate::domain::JobId) {
        (self.job.priority, self.job.run_at, self.job.id)
    }
}
