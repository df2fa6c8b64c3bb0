//! Scripted store used by unit tests: hands out a fixed sequence of claim
//! results and records what the worker did with each lease.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::time::Instant;

use crate::domain::{DEFAULT_PRIORITY, Job, JobId};
use crate::ports::{JobLease, JobStore, StoreError};

pub(crate) fn job(id: i64, job_type: &str) -> Job {
    job_with_args(id, job_type, json!({}))
}

pub(crate) fn job_with_args(id: i64, job_type: &str, args: serde_json::Value) -> Job {
    Job {
        id: JobId::new(id),
        queue: String::new(),
        priority: DEFAULT_PRIORITY,
        run_at: Utc::now(),
        job_type: job_type.to_string(),
        args,
        error_count: 0,
        last_error: None,
    }
}

/// What happened to one claimed job.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Ledger {
    pub errors: Vec<String>,
    pub deleted: bool,
    pub releases: u32,
}

type Ledgers = Arc<Mutex<HashMap<JobId, Ledger>>>;

#[derive(Default)]
pub(crate) struct ScriptedStore {
    script: Mutex<VecDeque<Result<Job, StoreError>>>,
    claims: Mutex<Vec<(Instant, String)>>,
    ledgers: Ledgers,
    fail_finalization: bool,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `report_error` and `delete` fail from now on.
    pub fn failing_finalization(mut self) -> Self {
        self.fail_finalization = true;
        self
    }

    pub fn push_job(&self, job: Job) {
        self.script.lock().unwrap().push_back(Ok(job));
    }

    pub fn push_claim_error(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(StoreError::Unavailable(message.to_string())));
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }

    pub fn ledger(&self, id: JobId) -> Ledger {
        self.ledgers.lock().unwrap().get(&id).cloned().unwrap_or_default()
    }

    pub fn claim_times(&self) -> Vec<Instant> {
        self.claims.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn claimed_queues(&self) -> Vec<String> {
        self.claims.lock().unwrap().iter().map(|(_, q)| q.clone()).collect()
    }
}

#[async_trait]
impl JobStore for ScriptedStore {
    async fn claim(&self, queue: &str) -> Result<Option<Box<dyn JobLease>>, StoreError> {
        self.claims
            .lock()
            .unwrap()
            .push((Instant::now(), queue.to_string()));

        let next = self.script.lock().unwrap().pop_front();
        match next {
            None => Ok(None),
            Some(Err(err)) => Err(err),
            Some(Ok(job)) => {
                self.ledgers.lock().unwrap().entry(job.id).or_default();
                Ok(Some(Box::new(ScriptedLease {
                    job,
                    ledgers: Arc::clone(&self.ledgers),
                    fail_finalization: self.fail_finalization,
                })))
            }
        }
    }
}

struct ScriptedLease {
    job: Job,
    ledgers: Ledgers,
    fail_finalization: bool,
}

impl ScriptedLease {
    fn update(&self, f: impl FnOnce(&mut Ledger)) {
        let mut ledgers = self.ledgers.lock().unwrap();
        f(ledgers.entry(self.job.id).or_default());
    }
}

#[async_trait]
impl JobLease for ScriptedLease {
    fn job(&self) -> &Job {
        &self.job
    }

    async fn report_error(&self, message: &str) -> Result<(), StoreError> {
        if self.fail_finalization {
            return Err(StoreError::Unavailable("report_error".into()));
        }
        self.update(|ledger| ledger.errors.push(message.to_string()));
        Ok(())
    }

    async fn delete(&self) -> Result<(), StoreError> {
        if self.fail_finalization {
            return Err(StoreError::Unavailable("delete".into()));
        }
        self.update(|ledger| ledger.deleted = true);
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        self.update(|ledger| ledger.releases += 1);
        Ok(())
    }
}
