// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::analysis::pipeline::AnalysisPipeline;
use crate::queue::job_queue::JobQueue;
use crate::workers::triage_worker::TriageWorker;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Worker manager
///
/// Owns the background worker tasks: spawns them at startup and aborts
/// them on shutdown. Workers share one pipeline and one queue.
pub struct WorkerManager<Q>
where
    Q: JobQueue + 'static,
{
    queue: Arc<Q>,
    pipeline: Arc<AnalysisPipeline>,
    poll_interval: Duration,
    handles: Vec<JoinHandle<()>>,
}

impl<Q> WorkerManager<Q>
where
    Q: JobQueue + Send + Sync,
{
    pub fn new(queue: Arc<Q>, pipeline: Arc<AnalysisPipeline>, poll_interval: Duration) -> Self {
        Self {
            queue,
            pipeline,
            poll_interval,
            handles: Vec::new(),
        }
    }

    /// Spawn `count` worker loops on their own tasks
    pub async fn start_workers(&mut self, count: usize) {
        for _ in 0..count {
            let worker = TriageWorker::new(self.pipeline.clone(), self.poll_interval);
            let queue = self.queue.clone();

            let handle = tokio::spawn(async move {
                worker.run(queue).await;
            });
            self.handles.push(handle);
        }

        info!("Started {} triage worker(s)", count);
    }

    /// Wait for a shutdown signal, then stop all workers
    pub async fn wait_for_shutdown(&mut self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }

        info!("Shutting down workers...");
        for handle in &self.handles {
            handle.abort();
        }

        info!("Workers shut down successfully");
    }
}
