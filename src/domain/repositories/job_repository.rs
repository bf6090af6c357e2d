// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::Job;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Repository layer error type
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// No job with the requested id
    #[error("job not found")]
    NotFound,

    /// The operation conflicts with the job's current state
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store-internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

/// Job store interface
///
/// The core depends only on these four operations plus the `Job` shape.
/// `claim_one_pending` is atomic with respect to status: a job handed to
/// one caller is never handed to a concurrent caller.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a newly submitted job
    async fn insert(&self, job: Job) -> Result<Job, RepositoryError>;

    /// Look up a job by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError>;

    /// Atomically claim the oldest pending, unclaimed job
    async fn claim_one_pending(&self) -> Result<Option<Job>, RepositoryError>;

    /// Commit a result for a claimed job and mark it processed
    async fn complete(&self, id: Uuid, result: serde_json::Value) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<T: JobRepository + ?Sized> JobRepository for std::sync::Arc<T> {
    async fn insert(&self, job: Job) -> Result<Job, RepositoryError> {
        (**self).insert(job).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError> {
        (**self).find_by_id(id).await
    }

    async fn claim_one_pending(&self) -> Result<Option<Job>, RepositoryError> {
        (**self).claim_one_pending().await
    }

    async fn complete(&self, id: Uuid, result: serde_json::Value) -> Result<(), RepositoryError> {
        (**self).complete(id, result).await
    }
}
