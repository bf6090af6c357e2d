// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::Job;
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Queue error type
#[derive(Error, Debug)]
pub enum QueueError {
    /// Store error
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Job queue trait
///
/// The submission surface enqueues; the worker loop claims and commits.
/// The two sides share no other state.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a freshly submitted job
    async fn enqueue(&self, job: Job) -> Result<Job, QueueError>;

    /// Atomically claim one pending job, oldest first
    async fn claim(&self) -> Result<Option<Job>, QueueError>;

    /// Commit a result for a claimed job
    async fn commit(&self, job_id: Uuid, result: serde_json::Value) -> Result<(), QueueError>;
}

/// Job queue backed by the job store
pub struct StoreJobQueue<R: JobRepository> {
    repository: Arc<R>,
}

impl<R: JobRepository> StoreJobQueue<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: JobRepository> JobQueue for StoreJobQueue<R> {
    async fn enqueue(&self, job: Job) -> Result<Job, QueueError> {
        let created = self.repository.insert(job).await?;
        Ok(created)
    }

    async fn claim(&self) -> Result<Option<Job>, QueueError> {
        let job = self.repository.claim_one_pending().await?;
        Ok(job)
    }

    async fn commit(&self, job_id: Uuid, result: serde_json::Value) -> Result<(), QueueError> {
        self.repository.complete(job_id, result).await?;
        Ok(())
    }
}

#[async_trait]
impl<T: JobQueue + ?Sized> JobQueue for Arc<T> {
    async fn enqueue(&self, job: Job) -> Result<Job, QueueError> {
        (**self).enqueue(job).await
    }

    async fn claim(&self) -> Result<Option<Job>, QueueError> {
        (**self).claim().await
    }

    async fn commit(&self, job_id: Uuid, result: serde_json::Value) -> Result<(), QueueError> {
        (**self).commit(job_id, result).await
    }
}
