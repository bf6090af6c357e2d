// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::models::job::{EndpointKind, Job};
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use crate::infrastructure::repositories::memory_job_repo::MemoryJobRepository;
use crate::presentation::errors::AppError;
use crate::queue::job_queue::{JobQueue, StoreJobQueue};

/// Submission request body
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub url: String,
}

/// Submit a URL for artifact download and static analysis
pub async fn submit_analyze(
    Extension(queue): Extension<Arc<StoreJobQueue<MemoryJobRepository>>>,
    Json(payload): Json<SubmitRequest>,
) -> impl IntoResponse {
    submit(queue, EndpointKind::Analyze, payload).await
}

/// Submit a URL for the statistical outlier peripheral
pub async fn submit_ztest(
    Extension(queue): Extension<Arc<StoreJobQueue<MemoryJobRepository>>>,
    Json(payload): Json<SubmitRequest>,
) -> impl IntoResponse {
    submit(queue, EndpointKind::Ztest, payload).await
}

/// Submit a URL for the page signature scan peripheral
pub async fn submit_scanpage(
    Extension(queue): Extension<Arc<StoreJobQueue<MemoryJobRepository>>>,
    Json(payload): Json<SubmitRequest>,
) -> impl IntoResponse {
    submit(queue, EndpointKind::Scanpage, payload).await
}

/// Shared submission path: validate, enqueue, acknowledge.
///
/// Returns 202 immediately; the caller polls the job endpoint for the
/// result.
async fn submit(
    queue: Arc<StoreJobQueue<MemoryJobRepository>>,
    endpoint: EndpointKind,
    payload: SubmitRequest,
) -> impl IntoResponse {
    if payload.url.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "url cannot be empty"
            })),
        );
    }
    if url::Url::parse(&payload.url).is_err() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "url is invalid"
            })),
        );
    }

    let job = Job::new(endpoint, payload.url);
    match queue.enqueue(job).await {
        Ok(created) => {
            info!(job_id = %created.id, endpoint = %endpoint, "job submitted");
            (
                StatusCode::ACCEPTED,
                Json(json!({
                    "success": true,
                    "job_id": created.id
                })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": e.to_string()
            })),
        ),
    }
}

/// Fetch a job by id, including its result once processed
pub async fn get_job(
    Extension(repository): Extension<Arc<MemoryJobRepository>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let job = repository
        .find_by_id(id)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(Json(job))
}
