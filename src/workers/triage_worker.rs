// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::analysis::pipeline::AnalysisPipeline;
use crate::domain::models::job::{EndpointKind, Job};
use crate::queue::job_queue::JobQueue;
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};
use uuid::Uuid;

/// Triage worker
///
/// Pulls one claimed job at a time from the queue, runs it through the
/// analysis pipeline and commits the result document. Polling backs off by
/// the configured interval when the queue is empty; a failed iteration
/// backs off the same way instead of spinning.
pub struct TriageWorker {
    pipeline: Arc<AnalysisPipeline>,
    poll_interval: Duration,
    worker_id: Uuid,
}

impl TriageWorker {
    pub fn new(pipeline: Arc<AnalysisPipeline>, poll_interval: Duration) -> Self {
        Self {
            pipeline,
            poll_interval,
            worker_id: Uuid::new_v4(),
        }
    }

    /// Run the worker loop
    pub async fn run<Q>(&self, queue: Arc<Q>)
    where
        Q: JobQueue + Send + Sync,
    {
        info!("Triage worker {} started", self.worker_id);

        loop {
            match self.process_next_job(queue.as_ref()).await {
                Ok(processed) => {
                    if !processed {
                        sleep(self.poll_interval).await;
                    }
                }
                Err(e) => {
                    error!("Error processing job: {}", e);
                    sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Claim and process at most one job; returns whether one was processed
    async fn process_next_job<Q>(&self, queue: &Q) -> Result<bool>
    where
        Q: JobQueue,
    {
        let Some(job) = queue.claim().await? else {
            return Ok(false);
        };

        info!(
            job_id = %job.id,
            endpoint = %job.endpoint,
            url = %job.url,
            "processing job"
        );

        let result = self.dispatch(&job).await;
        queue.commit(job.id, result).await?;

        info!(job_id = %job.id, "job processed");
        Ok(true)
    }

    /// Route a claimed job to its handler and always produce a result value
    async fn dispatch(&self, job: &Job) -> Value {
        match job.endpoint {
            EndpointKind::Analyze => self.run_analysis(job).await,
            EndpointKind::Ztest => json!({
                "error": "ztest processing is not handled by this service"
            }),
            EndpointKind::Scanpage => json!({
                "error": "scanpage processing is not handled by this service"
            }),
        }
    }

    /// Run the pipeline on its own task so a panic inside an analysis
    /// stage poisons one job, not the worker loop
    async fn run_analysis(&self, job: &Job) -> Value {
        let pipeline = self.pipeline.clone();
        let job_id = job.id;
        let url = job.url.clone();

        let handle = tokio::spawn(async move { pipeline.analyze(job_id, &url).await });

        match handle.await {
            Ok(report) => serde_json::to_value(&report).unwrap_or_else(|e| {
                json!({ "error": format!("result serialization failed: {e}") })
            }),
            Err(e) => {
                error!(%job_id, "analysis task failed: {}", e);
                json!({ "error": format!("analysis task failed: {e}") })
            }
        }
    }
}
