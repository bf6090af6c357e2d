// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{Job, JobStatus};
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// A job as held by the store.
///
/// `claimed` is private bookkeeping: the public status stays `Pending`
/// while the worker processes the job, but a claimed job is invisible to
/// further `claim_one_pending` calls.
#[derive(Debug, Clone)]
struct StoredJob {
    job: Job,
    claimed: bool,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<Uuid, StoredJob>,
    // Submission order, so the oldest pending job is claimed first
    order: VecDeque<Uuid>,
}

/// In-memory job store
///
/// The single mutable shared resource of the system. All mutations go
/// through one lock, which makes claim/commit atomic with respect to each
/// other and to concurrent claimants.
#[derive(Debug, Default)]
pub struct MemoryJobRepository {
    inner: Mutex<Inner>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn insert(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut inner = self.inner.lock();
        if inner.jobs.contains_key(&job.id) {
            return Err(RepositoryError::Conflict(format!(
                "job {} already exists",
                job.id
            )));
        }
        inner.order.push_back(job.id);
        inner.jobs.insert(
            job.id,
            StoredJob {
                job: job.clone(),
                claimed: false,
            },
        );
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError> {
        let inner = self.inner.lock();
        Ok(inner.jobs.get(&id).map(|stored| stored.job.clone()))
    }

    async fn claim_one_pending(&self) -> Result<Option<Job>, RepositoryError> {
        let mut inner = self.inner.lock();
        let candidate = inner.order.iter().copied().find(|id| {
            inner
                .jobs
                .get(id)
                .map(|stored| stored.job.status == JobStatus::Pending && !stored.claimed)
                .unwrap_or(false)
        });

        match candidate {
            Some(id) => {
                let stored = inner
                    .jobs
                    .get_mut(&id)
                    .ok_or_else(|| RepositoryError::Internal("claim lost job entry".into()))?;
                stored.claimed = true;
                Ok(Some(stored.job.clone()))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, id: Uuid, result: serde_json::Value) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock();
        let stored = inner.jobs.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        let processed = stored
            .job
            .clone()
            .process(result)
            .map_err(|e| RepositoryError::Conflict(format!("job {}: {}", id, e)))?;
        stored.job = processed;
        Ok(())
    }
}
