// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application configuration settings
///
/// Covers the HTTP server, the background worker, artifact fetching, the
/// analysis pipeline and the optional external capabilities (signature
/// rules, anti-malware daemon, reputation lookup)
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// HTTP server configuration
    pub server: ServerSettings,
    /// Background worker configuration
    pub worker: WorkerSettings,
    /// Artifact fetch configuration
    pub fetch: FetchSettings,
    /// Analysis pipeline configuration
    pub analysis: AnalysisSettings,
    /// Signature rule set configuration
    pub signatures: SignatureSettings,
    /// Anti-malware daemon configuration
    pub clamav: ClamavSettings,
    /// Reputation lookup configuration
    pub reputation: ReputationSettings,
}

/// HTTP server configuration settings
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
}

/// Background worker configuration settings
#[derive(Debug, Deserialize)]
pub struct WorkerSettings {
    /// Seconds to wait between polls when no job is pending
    pub poll_interval_secs: u64,
}

/// Artifact fetch configuration settings
#[derive(Debug, Deserialize)]
pub struct FetchSettings {
    /// Download timeout in seconds
    pub timeout_secs: u64,
    /// Maximum accepted response body size in bytes
    pub max_body_bytes: u64,
}

/// Analysis pipeline configuration settings
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSettings {
    /// Root directory under which per-job working directories are created
    pub job_root: String,
    /// Maximum archive recursion depth
    pub max_archive_depth: u32,
}

/// Signature rule set configuration settings
#[derive(Debug, Deserialize)]
pub struct SignatureSettings {
    /// Directory scanned for `.yar` / `.yara` rule files at startup
    pub rules_dir: String,
}

/// Anti-malware daemon configuration settings
#[derive(Debug, Deserialize)]
pub struct ClamavSettings {
    /// Unix socket path of the clamd daemon; absent means the capability
    /// is not configured, which is a valid state
    pub socket_path: Option<String>,
    /// Socket operation timeout in seconds
    pub timeout_secs: u64,
}

/// Reputation lookup configuration settings
#[derive(Debug, Deserialize)]
pub struct ReputationSettings {
    /// API key; absent disables the lookup
    pub api_key: Option<String>,
    /// Base URL of the file-reputation endpoint
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Settings {
    /// Load configuration from defaults, optional config files and
    /// `TRIAGRS__`-prefixed environment variables
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            // Default worker settings
            .set_default("worker.poll_interval_secs", 5)?
            // Default fetch settings
            .set_default("fetch.timeout_secs", 10)?
            .set_default("fetch.max_body_bytes", 256 * 1024 * 1024i64)?
            // Default analysis settings
            .set_default("analysis.job_root", "/tmp/sandbox_jobs")?
            .set_default("analysis.max_archive_depth", 3)?
            // Default signature settings
            .set_default("signatures.rules_dir", "rules")?
            // Default clamav settings
            .set_default("clamav.timeout_secs", 10)?
            // Default reputation settings
            .set_default(
                "reputation.base_url",
                "https://www.virustotal.com/api/v3/files",
            )?
            .set_default("reputation.timeout_secs", 10)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("TRIAGRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}
