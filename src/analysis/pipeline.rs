// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::analysis::archive::{
    collect_extracted_files, extract_container, extract_debian_package, is_container,
    is_debian_package, strip_exec_bits,
};
use crate::analysis::entropy::file_entropy;
use crate::analysis::fetcher::{FetchError, SandboxedFetcher};
use crate::analysis::hashing::sha256_file;
use crate::analysis::iocs::extract_iocs;
use crate::analysis::pe::inspect_pe;
use crate::analysis::signatures::SignatureSet;
use crate::analysis::sniff::detect_file_type;
use crate::analysis::strings::keyword_score;
use crate::config::settings::AnalysisSettings;
use crate::domain::models::report::{AnalysisReport, FileDetail, SuspicionLevel};
use crate::infrastructure::clamav::ClamAvClient;
use crate::infrastructure::reputation::ReputationClient;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Root-artifact entropy at or above this contributes to the score
const ENTROPY_SCORE_THRESHOLD: f64 = 7.5;
/// Score contribution of a high-entropy root artifact
const WEIGHT_ENTROPY: u32 = 5;
/// Score contribution of at least one signature rule match
const WEIGHT_SIGNATURE: u32 = 5;
/// Score contribution of at least one suspicious executable import
const WEIGHT_IMPORTS: u32 = 5;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Combine the boolean stage findings and the keyword score into the
/// aggregate suspicion score
pub fn suspicion_score(
    high_entropy: bool,
    signature_hit: bool,
    suspicious_import: bool,
    string_score: u32,
) -> u32 {
    let mut score = string_score;
    if high_entropy {
        score += WEIGHT_ENTROPY;
    }
    if signature_hit {
        score += WEIGHT_SIGNATURE;
    }
    if suspicious_import {
        score += WEIGHT_IMPORTS;
    }
    score
}

/// Scoring evidence accumulated across the whole expansion tree
#[derive(Default)]
struct ScoreInputs {
    high_entropy: bool,
    signature_hit: bool,
    suspicious_import: bool,
    string_score: u32,
}

/// One pending file in the expansion worklist
struct WorkItem {
    path: PathBuf,
    depth: u32,
}

/// The full analysis pass over one submitted URL.
///
/// Fetches the artifact into a per-job sandbox directory, then walks an
/// explicit depth-annotated worklist: every node gets the static stages,
/// and container nodes push their extracted children back onto the list.
/// Stage failures degrade to warnings; only a failed download or a broken
/// sandbox aborts the pass, and even then the partial report survives.
pub struct AnalysisPipeline {
    fetcher: SandboxedFetcher,
    signatures: Arc<SignatureSet>,
    clamav: Option<Arc<ClamAvClient>>,
    reputation: Option<Arc<ReputationClient>>,
    job_root: PathBuf,
    max_depth: u32,
}

impl AnalysisPipeline {
    pub fn new(
        fetcher: SandboxedFetcher,
        signatures: Arc<SignatureSet>,
        clamav: Option<Arc<ClamAvClient>>,
        reputation: Option<Arc<ReputationClient>>,
        settings: &AnalysisSettings,
    ) -> Self {
        Self {
            fetcher,
            signatures,
            clamav,
            reputation,
            job_root: PathBuf::from(&settings.job_root),
            max_depth: settings.max_archive_depth,
        }
    }

    /// Analyze one URL and always produce a report.
    ///
    /// An aborting failure is recorded in the report's `error` slot; the
    /// score is derived from whatever evidence was gathered before it.
    pub async fn analyze(&self, job_id: Uuid, url: &str) -> AnalysisReport {
        let mut report = AnalysisReport::new(job_id, url);
        let mut inputs = ScoreInputs::default();

        if let Err(e) = self.run(job_id, url, &mut report, &mut inputs).await {
            warn!(%job_id, error = %e, "analysis aborted");
            report.error = Some(e.to_string());
        }

        report.suspicion_score = suspicion_score(
            inputs.high_entropy,
            inputs.signature_hit,
            inputs.suspicious_import,
            inputs.string_score,
        );
        report.suspicion_level = SuspicionLevel::from_score(report.suspicion_score);

        info!(
            %job_id,
            score = report.suspicion_score,
            level = ?report.suspicion_level,
            files = report.details.len(),
            "analysis finished"
        );
        report
    }

    async fn run(
        &self,
        job_id: Uuid,
        url: &str,
        report: &mut AnalysisReport,
        inputs: &mut ScoreInputs,
    ) -> Result<(), PipelineError> {
        let job_dir = self.job_root.join(job_id.to_string());
        fs::create_dir_all(&job_dir)?;

        let root_path = job_dir.join("artifact");
        self.fetcher.fetch_to(url, &root_path).await?;
        report.download_success = true;

        let sha256 = sha256_file(&root_path)?;
        report.sha256 = Some(sha256.clone());

        report.antivirus_scan = Some(self.antivirus_verdict(&root_path).await);

        if let Some(reputation) = &self.reputation {
            report.reputation = Some(reputation.lookup(&sha256).await);
        }

        self.walk(&job_dir, root_path, report, inputs);
        Ok(())
    }

    /// Depth-first walk over the artifact and everything extracted from it
    fn walk(
        &self,
        job_dir: &Path,
        root_path: PathBuf,
        report: &mut AnalysisReport,
        inputs: &mut ScoreInputs,
    ) {
        let mut worklist = vec![WorkItem {
            path: root_path,
            depth: 0,
        }];

        while let Some(item) = worklist.pop() {
            if item.depth > self.max_depth {
                report.warnings.push(format!(
                    "max archive depth exceeded at {}",
                    display_relative(job_dir, &item.path)
                ));
                continue;
            }

            let data = match fs::read(&item.path) {
                Ok(data) => data,
                Err(e) => {
                    report.warnings.push(format!(
                        "read failed for {}: {e}",
                        display_relative(job_dir, &item.path)
                    ));
                    continue;
                }
            };

            let file_type = detect_file_type(&data);
            let container = is_container(&file_type);
            let debian = is_debian_package(&file_type);

            if item.depth == 0 {
                report.file_type = Some(file_type.clone());
                let entropy = file_entropy(&data);
                report.file_entropy = Some(entropy);
                if entropy >= ENTROPY_SCORE_THRESHOLD {
                    inputs.high_entropy = true;
                }
            }

            if item.depth > 0 || container || debian {
                report.details.push(FileDetail {
                    file: display_relative(job_dir, &item.path),
                    file_type: file_type.clone(),
                });
            }

            self.scan_signatures(&data, item.depth, report, inputs);
            self.inspect_executable(&data, &file_type, job_dir, &item.path, report, inputs);

            report.iocs.merge(extract_iocs(&data));
            inputs.string_score = inputs.string_score.max(keyword_score(&data));

            if container {
                self.expand(&item, job_dir, report, &mut worklist, |path, dest| {
                    extract_container(path, &file_type, dest)
                });
            } else if debian {
                self.expand(&item, job_dir, report, &mut worklist, extract_debian_package);
            }
        }
    }

    fn scan_signatures(
        &self,
        data: &[u8],
        depth: u32,
        report: &mut AnalysisReport,
        inputs: &mut ScoreInputs,
    ) {
        let matches = self.signatures.scan(data);
        let real: Vec<String> = matches
            .iter()
            .filter(|m| {
                m.as_str() != SignatureSet::NOT_LOADED
                    && m.as_str() != SignatureSet::NO_MATCHES
                    && !m.starts_with("yara scan error")
            })
            .cloned()
            .collect();

        if !real.is_empty() {
            inputs.signature_hit = true;
        }

        if depth == 0 {
            // The root slot keeps sentinels so the report always says
            // whether scanning was possible
            report.signature_matches = Some(matches);
        } else if !real.is_empty() {
            let slot = report.signature_matches.get_or_insert_with(Vec::new);
            slot.retain(|m| {
                m != SignatureSet::NOT_LOADED && m != SignatureSet::NO_MATCHES
            });
            for name in real {
                if !slot.contains(&name) {
                    slot.push(name);
                }
            }
        }
    }

    fn inspect_executable(
        &self,
        data: &[u8],
        file_type: &str,
        job_dir: &Path,
        path: &Path,
        report: &mut AnalysisReport,
        inputs: &mut ScoreInputs,
    ) {
        if !file_type.contains("pe32") && !file_type.contains("ms windows pe") {
            return;
        }

        match inspect_pe(data) {
            Ok(summary) => {
                if !summary.suspicious_imports.is_empty() {
                    inputs.suspicious_import = true;
                }
                if report.pe_analysis.is_none() {
                    report.pe_analysis = Some(summary);
                }
            }
            Err(e) => {
                report.warnings.push(format!(
                    "pe parse error for {}: {e}",
                    display_relative(job_dir, path)
                ));
            }
        }
    }

    /// Extract one container node and queue its children one level deeper.
    ///
    /// Each container gets its own extraction directory, keyed by its file
    /// name, so sibling containers in the same directory never share output
    /// and only this node's children are queued.
    fn expand<F, E>(
        &self,
        item: &WorkItem,
        job_dir: &Path,
        report: &mut AnalysisReport,
        worklist: &mut Vec<WorkItem>,
        extract: F,
    ) where
        F: FnOnce(&Path, &Path) -> Result<Vec<String>, E>,
        E: std::fmt::Display,
    {
        let next_depth = item.depth + 1;
        let parent = item.path.parent().unwrap_or(job_dir);
        let name = item
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        let nested_dir = parent.join(format!("nested_{next_depth}_{name}"));

        let entry_warnings = match extract(&item.path, &nested_dir) {
            Ok(entry_warnings) => entry_warnings,
            Err(e) => {
                report.warnings.push(format!(
                    "extraction failed for {}: {e}",
                    display_relative(job_dir, &item.path)
                ));
                return;
            }
        };
        for warning in entry_warnings {
            report.warnings.push(format!(
                "{}: {warning}",
                display_relative(job_dir, &item.path)
            ));
        }

        for file in collect_extracted_files(&nested_dir) {
            if let Err(e) = strip_exec_bits(&file) {
                warn!(file = %file.display(), error = %e, "could not strip exec bits");
            }
            worklist.push(WorkItem {
                path: file,
                depth: next_depth,
            });
        }
    }

    async fn antivirus_verdict(&self, path: &Path) -> String {
        let Some(clamav) = &self.clamav else {
            return "clamav not available".to_string();
        };

        if clamav.ping().await.is_err() {
            return "clamav daemon not responding".to_string();
        }

        match clamav.scan(path).await {
            Ok(Some(signature)) => format!("clamav detection: {signature}"),
            Ok(None) => "no virus found by clamav".to_string(),
            Err(e) => format!("clamav scan error: {e}"),
        }
    }
}

/// Render a sandbox path relative to the job directory for the report
fn display_relative(job_dir: &Path, path: &Path) -> String {
    path.strip_prefix(job_dir)
        .unwrap_or(path)
        .display()
        .to_string()
}
