// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::repositories::job_repository::RepositoryError;

/// Application error type
///
/// Wraps any lower-layer error and maps it onto an HTTP status with a
/// JSON error body
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_message = self.0.to_string();

        let status = match self.0.downcast_ref::<RepositoryError>() {
            Some(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Some(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Some(RepositoryError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            None => {
                if error_message.contains("cannot be empty")
                    || error_message.contains("invalid")
                    || error_message.contains("required")
                {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
