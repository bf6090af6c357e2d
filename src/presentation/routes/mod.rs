// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::presentation::handlers::job_handler;
use axum::{
    routing::{get, post},
    Router,
};

/// Create the application router
pub fn routes() -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let api_routes = Router::new()
        .route("/v1/analyze", post(job_handler::submit_analyze))
        .route("/v1/ztest", post(job_handler::submit_ztest))
        .route("/v1/scanpage", post(job_handler::submit_scanpage))
        .route("/v1/job/{id}", get(job_handler::get_job));

    Router::new().merge(public_routes).merge(api_routes)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
