// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::FetchSettings;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("download failed with status {status}")]
    Failed { status: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bounded HTTP downloader for untrusted artifacts.
///
/// Bodies stream straight to disk inside the job sandbox; nothing is
/// buffered whole in memory, and a response that exceeds the configured
/// byte cap is abandoned mid-stream.
pub struct SandboxedFetcher {
    client: reqwest::Client,
    max_body_bytes: u64,
}

impl SandboxedFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: settings.max_body_bytes,
        })
    }

    /// Download `url` into `dest`, replacing any existing file.
    ///
    /// Returns the number of bytes written. Non-2xx statuses are errors;
    /// redirects are followed by the client up to its default limit.
    pub async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Failed {
                status: status.as_u16(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        let mut response = response;

        while let Some(chunk) = response.chunk().await? {
            written += chunk.len() as u64;
            if written > self.max_body_bytes {
                drop(file);
                tokio::fs::remove_file(dest).await.ok();
                return Err(FetchError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        debug!(url, bytes = written, dest = %dest.display(), "artifact downloaded");
        Ok(written)
    }
}
