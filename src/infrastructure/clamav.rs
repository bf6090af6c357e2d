// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClamAvError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("clamd did not respond within {0:?}")]
    Timeout(Duration),

    #[error("unexpected clamd response: {0}")]
    Protocol(String),

    #[error("clamd is not supported on this platform")]
    Unsupported,
}

/// Thin client for a local clamd daemon over its unix socket.
///
/// Uses the null-terminated command framing (`zPING`, `zSCAN`) so replies
/// are unambiguous. The daemon scans the file by path, so the file must be
/// readable by the clamd user.
pub struct ClamAvClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl ClamAvClient {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }

    /// Check daemon liveness
    pub async fn ping(&self) -> Result<(), ClamAvError> {
        let reply = self.roundtrip(b"zPING\0").await?;
        if reply.trim_end_matches('\0').trim() == "PONG" {
            Ok(())
        } else {
            Err(ClamAvError::Protocol(reply))
        }
    }

    /// Scan a file by path.
    ///
    /// Returns `Ok(Some(signature))` on a detection, `Ok(None)` when the
    /// daemon reports the file clean.
    pub async fn scan(&self, path: &Path) -> Result<Option<String>, ClamAvError> {
        let command = format!("zSCAN {}\0", path.display());
        let reply = self.roundtrip(command.as_bytes()).await?;
        let reply = reply.trim_end_matches('\0').trim();

        // Replies look like "<path>: OK" or "<path>: <signature> FOUND"
        let verdict = reply
            .rsplit_once(": ")
            .map(|(_, v)| v)
            .unwrap_or(reply);

        if verdict == "OK" {
            Ok(None)
        } else if let Some(signature) = verdict.strip_suffix(" FOUND") {
            Ok(Some(signature.to_string()))
        } else {
            Err(ClamAvError::Protocol(reply.to_string()))
        }
    }

    #[cfg(unix)]
    async fn roundtrip(&self, command: &[u8]) -> Result<String, ClamAvError> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::UnixStream;

        let exchange = async {
            let mut stream = UnixStream::connect(&self.socket_path).await?;
            stream.write_all(command).await?;
            stream.shutdown().await?;

            let mut reply = Vec::new();
            stream.read_to_end(&mut reply).await?;
            Ok::<_, std::io::Error>(String::from_utf8_lossy(&reply).into_owned())
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ClamAvError::Timeout(self.timeout)),
        }
    }

    #[cfg(not(unix))]
    async fn roundtrip(&self, _command: &[u8]) -> Result<String, ClamAvError> {
        Err(ClamAvError::Unsupported)
    }
}
