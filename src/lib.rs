// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Analysis module
///
/// Implements the static-analysis stages, the sandboxed archive expansion
/// engine and the pipeline orchestrator that drives them
pub mod analysis;

/// Configuration module
///
/// Handles application configuration settings and environment variables
pub mod config;

/// Domain module
///
/// Contains core business entities and repository interfaces
pub mod domain;

/// Infrastructure module
///
/// Provides external service integrations: the job store, the reputation
/// lookup service and the anti-malware daemon
pub mod infrastructure;

/// Presentation module
///
/// Handles HTTP requests and responses, including routes and handlers
pub mod presentation;

/// Queue module
///
/// Implements the claim/commit facade over the job store
pub mod queue;

/// Utility module
///
/// Provides telemetry setup and the confinement path guard
pub mod utils;

/// Worker module
///
/// Implements the background triage worker and its manager
pub mod workers;
