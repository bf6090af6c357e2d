// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Extension;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use triagrs::analysis::fetcher::SandboxedFetcher;
use triagrs::analysis::pipeline::AnalysisPipeline;
use triagrs::analysis::signatures::SignatureSet;
use triagrs::config::settings::Settings;
use triagrs::infrastructure::clamav::ClamAvClient;
use triagrs::infrastructure::repositories::memory_job_repo::MemoryJobRepository;
use triagrs::infrastructure::reputation::ReputationClient;
use triagrs::presentation::routes;
use triagrs::queue::job_queue::StoreJobQueue;
use triagrs::utils::telemetry;
use triagrs::workers::manager::WorkerManager;

/// Application entry point: wires up the store, the pipeline, the worker
/// loop and the HTTP surface
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting triagrs...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Compile signature rules
    let signatures = Arc::new(SignatureSet::compile_dir(Path::new(
        &settings.signatures.rules_dir,
    )));
    if signatures.is_loaded() {
        info!(
            "Signature rules loaded from {} ({} file(s))",
            settings.signatures.rules_dir,
            signatures.rule_file_count()
        );
    }

    // 4. Initialize the job store and queue
    let repository = Arc::new(MemoryJobRepository::new());
    let queue = Arc::new(StoreJobQueue::new(repository.clone()));

    // 5. Initialize external capabilities; each is optional and absence
    //    degrades the matching report slot, not the service
    let clamav = settings.clamav.socket_path.as_ref().map(|path| {
        Arc::new(ClamAvClient::new(
            path,
            Duration::from_secs(settings.clamav.timeout_secs),
        ))
    });
    if clamav.is_none() {
        info!("ClamAV socket not configured, antivirus stage disabled");
    }

    let reputation = match &settings.reputation.api_key {
        Some(api_key) => Some(Arc::new(ReputationClient::new(
            &settings.reputation.base_url,
            api_key,
            Duration::from_secs(settings.reputation.timeout_secs),
        )?)),
        None => {
            info!("Reputation API key not configured, reputation stage disabled");
            None
        }
    };

    // 6. Build the analysis pipeline
    let fetcher = SandboxedFetcher::new(&settings.fetch)?;
    let pipeline = Arc::new(AnalysisPipeline::new(
        fetcher,
        signatures,
        clamav,
        reputation,
        &settings.analysis,
    ));

    // 7. Start the triage worker
    let mut worker_manager = WorkerManager::new(
        queue.clone(),
        pipeline,
        Duration::from_secs(settings.worker.poll_interval_secs),
    );
    worker_manager.start_workers(1).await;

    // 8. Start the HTTP server
    let app = routes::routes()
        .layer(Extension(queue))
        .layer(Extension(repository))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = worker_manager.wait_for_shutdown() => {}
    }

    Ok(())
}
