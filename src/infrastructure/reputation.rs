// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Hash-reputation lookup client with a process-scoped result cache.
///
/// Looks a SHA-256 up against a VirusTotal-compatible file endpoint and
/// condenses the answer to the fields the report cares about. Lookups never
/// fail the pipeline: every outcome, including transport errors, is encoded
/// as a JSON value in the report's reputation slot. Definitive outcomes
/// (known or unknown hash) are cached for the life of the process.
pub struct ReputationClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    cache: DashMap<String, Value>,
}

impl ReputationClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            cache: DashMap::new(),
        })
    }

    pub async fn lookup(&self, sha256: &str) -> Value {
        if let Some(cached) = self.cache.get(sha256) {
            debug!(sha256, "reputation cache hit");
            return cached.clone();
        }

        let outcome = self.fetch(sha256).await;
        if Self::is_definitive(&outcome) {
            self.cache.insert(sha256.to_string(), outcome.clone());
        }
        outcome
    }

    async fn fetch(&self, sha256: &str) -> Value {
        let url = format!("{}/{}", self.base_url, sha256);
        let response = match self
            .client
            .get(&url)
            .header("x-apikey", &self.api_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return json!({ "error": format!("reputation lookup failed: {e}") }),
        };

        match response.status().as_u16() {
            200 => match response.json::<Value>().await {
                Ok(body) => Self::condense(&body),
                Err(e) => json!({ "error": format!("reputation response unreadable: {e}") }),
            },
            404 => json!({ "found": false }),
            status => json!({ "error": format!("reputation lookup failed with status {status}") }),
        }
    }

    /// Reduce the full provider document to the stats, the community
    /// reputation and the engines that flagged the hash.
    fn condense(body: &Value) -> Value {
        let attributes = &body["data"]["attributes"];

        let flagged: serde_json::Map<String, Value> = attributes["last_analysis_results"]
            .as_object()
            .map(|engines| {
                engines
                    .iter()
                    .filter(|(_, verdict)| {
                        matches!(
                            verdict["category"].as_str(),
                            Some("malicious") | Some("suspicious")
                        )
                    })
                    .map(|(engine, verdict)| {
                        (
                            engine.clone(),
                            json!({
                                "category": verdict["category"],
                                "result": verdict["result"],
                            }),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        json!({
            "found": true,
            "reputation": attributes["reputation"],
            "last_analysis_stats": attributes["last_analysis_stats"],
            "flagged_engines": flagged,
        })
    }

    fn is_definitive(outcome: &Value) -> bool {
        outcome.get("error").is_none()
    }
}
