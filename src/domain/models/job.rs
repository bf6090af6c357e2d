// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Job entity
///
/// Represents one submitted triage request. A job is created in `Pending`
/// state by the submission surface and is mutated exactly once by the
/// worker loop, which commits an analysis result and moves it to
/// `Processed`. Jobs are never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier
    pub id: Uuid,
    /// Endpoint kind the job was submitted through
    pub endpoint: EndpointKind,
    /// Submitted URL
    pub url: String,
    /// Lifecycle status
    pub status: JobStatus,
    /// Result payload, set once when the job is processed
    pub result: Option<serde_json::Value>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Processing-completion timestamp
    pub processed_at: Option<DateTime<Utc>>,
}

/// Endpoint kind enumeration
///
/// `Analyze` is the triage pipeline; `Ztest` and `Scanpage` are accepted
/// for submission but handled by out-of-scope peripherals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// Artifact download and static analysis
    #[default]
    Analyze,
    /// Statistical outlier test peripheral
    Ztest,
    /// Page signature scan peripheral
    Scanpage,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EndpointKind::Analyze => write!(f, "analyze"),
            EndpointKind::Ztest => write!(f, "ztest"),
            EndpointKind::Scanpage => write!(f, "scanpage"),
        }
    }
}

impl FromStr for EndpointKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analyze" => Ok(EndpointKind::Analyze),
            "ztest" => Ok(EndpointKind::Ztest),
            "scanpage" => Ok(EndpointKind::Scanpage),
            _ => Err(()),
        }
    }
}

/// Job status enumeration
///
/// Transitions follow `Pending → Processed`, at most once. An error during
/// processing still ends in `Processed` with an error-carrying result;
/// there is no failure state that leaves a job stuck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Submitted, not yet picked up by the worker
    #[default]
    Pending,
    /// Terminal: result committed by the worker
    Processed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processed => write!(f, "processed"),
        }
    }
}

/// Domain error type
#[derive(Error, Debug)]
pub enum DomainError {
    /// The requested status transition is not allowed
    #[error("Invalid state transition")]
    InvalidStateTransition,
}

impl Job {
    /// Create a new pending job
    pub fn new(endpoint: EndpointKind, url: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint,
            url,
            status: JobStatus::Pending,
            result: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    /// Commit a result and move the job to `Processed`
    ///
    /// Fails if the job has already been processed; the transition happens
    /// at most once.
    pub fn process(mut self, result: serde_json::Value) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Pending => {
                self.status = JobStatus::Processed;
                self.result = Some(result);
                self.processed_at = Some(Utc::now());
                Ok(self)
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new(EndpointKind::Analyze, "http://example.com/a.bin".into());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.result.is_none());
        assert!(job.processed_at.is_none());
    }

    #[test]
    fn test_process_transitions_once() {
        let job = Job::new(EndpointKind::Analyze, "http://example.com/a.bin".into());
        let processed = job.process(json!({"suspicion_score": 0})).unwrap();
        assert_eq!(processed.status, JobStatus::Processed);
        assert!(processed.processed_at.is_some());

        let err = processed.process(json!({})).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition));
    }

    #[test]
    fn test_endpoint_kind_round_trip() {
        for kind in [
            EndpointKind::Analyze,
            EndpointKind::Ztest,
            EndpointKind::Scanpage,
        ] {
            assert_eq!(kind.to_string().parse::<EndpointKind>().unwrap(), kind);
        }
    }
}
