// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Aggregate result document produced by one pipeline pass over a job.
///
/// Created fresh per job, fully populated by the orchestrator, immutable
/// once returned. Stage failures land in `warnings` or in the stage's own
/// slot; an orchestrator-level failure lands in `error` while partial
/// findings are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Owning job identifier
    pub job_id: Uuid,
    /// Source URL the artifact was fetched from
    pub file_url: String,
    /// Whether the download succeeded
    pub download_success: bool,
    /// SHA-256 of the root artifact, lowercase hex
    pub sha256: Option<String>,
    /// Detected type label of the root artifact
    pub file_type: Option<String>,
    /// Shannon entropy of the root artifact, bits, rounded to 2 decimals
    pub file_entropy: Option<f64>,
    /// Matching signature rule names, or a sentinel entry
    pub signature_matches: Option<Vec<String>>,
    /// Anti-malware verdict string
    pub antivirus_scan: Option<String>,
    /// Structural summary of the first executable-format artifact seen
    pub pe_analysis: Option<PeSummary>,
    /// Reputation lookup outcome keyed by the artifact hash
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation: Option<serde_json::Value>,
    /// Extracted indicators of compromise
    pub iocs: IocSet,
    /// Aggregate suspicion score
    pub suspicion_score: u32,
    /// Aggregate suspicion level
    pub suspicion_level: SuspicionLevel,
    /// Ordered free-text problems encountered during the pass
    pub warnings: Vec<String>,
    /// Per-file records produced during recursive expansion
    pub details: Vec<FileDetail>,
    /// Orchestrator-level error, if the pass did not complete cleanly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisReport {
    /// Create an empty report for a job, before any stage has run
    pub fn new(job_id: Uuid, file_url: &str) -> Self {
        Self {
            job_id,
            file_url: file_url.to_string(),
            download_success: false,
            sha256: None,
            file_type: None,
            file_entropy: None,
            signature_matches: None,
            antivirus_scan: None,
            pe_analysis: None,
            reputation: None,
            iocs: IocSet::default(),
            suspicion_score: 0,
            suspicion_level: SuspicionLevel::Unknown,
            warnings: Vec::new(),
            details: Vec::new(),
            error: None,
        }
    }
}

/// Structural summary of a Windows executable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeSummary {
    /// Section names with entropy above 7.0 bits
    pub high_entropy_sections: Vec<String>,
    /// Imported symbols found on the suspicious-API list
    pub suspicious_imports: Vec<String>,
}

/// Deduplicated indicator sets extracted from raw bytes.
///
/// Ordered sets keep output deterministic across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IocSet {
    /// Domain-like tokens
    pub domains: BTreeSet<String>,
    /// Dotted-quad IP-like tokens
    pub ips: BTreeSet<String>,
    /// Absolute filesystem-path-like tokens
    pub file_paths: BTreeSet<String>,
}

impl IocSet {
    /// Merge another set into this one (set union per indicator class)
    pub fn merge(&mut self, other: IocSet) {
        self.domains.extend(other.domains);
        self.ips.extend(other.ips);
        self.file_paths.extend(other.file_paths);
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.ips.is_empty() && self.file_paths.is_empty()
    }
}

/// One record per analyzed file in the expansion tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDetail {
    /// Path of the file within the job's working tree
    pub file: String,
    /// Detected type label
    pub file_type: String,
}

/// Categorical verdict derived from the suspicion score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum SuspicionLevel {
    /// Nothing scored
    #[default]
    Unknown,
    /// Score above zero
    Low,
    /// Score at or above the medium threshold
    Medium,
    /// Score at or above the high threshold
    High,
}

impl SuspicionLevel {
    /// Score at or above which the verdict is `High`
    pub const HIGH_THRESHOLD: u32 = 15;
    /// Score at or above which the verdict is `Medium`
    pub const MEDIUM_THRESHOLD: u32 = 8;

    /// Map a suspicion score onto its categorical level
    pub fn from_score(score: u32) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            SuspicionLevel::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            SuspicionLevel::Medium
        } else if score > 0 {
            SuspicionLevel::Low
        } else {
            SuspicionLevel::Unknown
        }
    }
}
