// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client: one-shot framed calls over the control socket.

use atari_daemon::protocol::{self, ProtocolError};
use atari_daemon::{Request, Response, RetryParams, StatusResult, StopParams};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::net::UnixStream;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Client call timeout (default: 5s).
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("ATARI_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Client errors, classified for exit codes.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running (no socket at {0})")]
    NotRunningNotFound(PathBuf),

    #[error("daemon not running (connection refused)")]
    NotRunningRefused,

    #[error("request timed out")]
    TimedOut,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("mismatched response id (sent {sent}, got {got})")]
    MismatchedId { sent: u64, got: u64 },

    #[error("daemon error: {0}")]
    Daemon(String),
}

impl ClientError {
    /// CLI exit code: 1 daemon not running, 2 protocol error, 3 daemon
    /// error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotRunningNotFound(_) | Self::NotRunningRefused => 1,
            Self::TimedOut | Self::Protocol(_) | Self::MismatchedId { .. } => 2,
            Self::Daemon(_) => 3,
        }
    }
}

/// One-shot RPC client for the supervisor's control socket.
pub struct RpcClient {
    socket_path: PathBuf,
    timeout: Duration,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send one request, read one response.
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ClientError> {
        let stream = self.connect().await?;
        let (mut reader, mut writer) = stream.into_split();

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = Request::new(method, params, id);
        let data = protocol::encode(&request)?;
        tokio::time::timeout(self.timeout, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ClientError::TimedOut)??;

        let bytes = tokio::time::timeout(self.timeout, protocol::read_message(&mut reader))
            .await
            .map_err(|_| ClientError::TimedOut)??;
        let response: Response =
            serde_json::from_slice(&bytes).map_err(|e| ClientError::Protocol(e.into()))?;

        if response.id != id {
            return Err(ClientError::MismatchedId {
                sent: id,
                got: response.id,
            });
        }
        if response.is_err() {
            return Err(ClientError::Daemon(response.error));
        }
        Ok(response.result)
    }

    pub async fn status(&self) -> Result<StatusResult, ClientError> {
        let result = self.call("status", serde_json::Value::Null).await?;
        serde_json::from_value(result).map_err(|e| ClientError::Protocol(e.into()))
    }

    pub async fn pause(&self) -> Result<String, ClientError> {
        self.call_for_string("pause", serde_json::Value::Null).await
    }

    pub async fn resume(&self) -> Result<String, ClientError> {
        self.call_for_string("resume", serde_json::Value::Null).await
    }

    pub async fn stop(&self, force: bool) -> Result<String, ClientError> {
        let params = serde_json::to_value(StopParams { force })
            .map_err(|e| ClientError::Protocol(e.into()))?;
        self.call_for_string("stop", params).await
    }

    pub async fn retry(&self, bead_id: Option<String>) -> Result<String, ClientError> {
        let params = serde_json::to_value(RetryParams { bead_id })
            .map_err(|e| ClientError::Protocol(e.into()))?;
        self.call_for_string("retry", params).await
    }

    async fn call_for_string(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<String, ClientError> {
        let result = self.call(method, params).await?;
        Ok(result.as_str().unwrap_or_default().to_string())
    }

    async fn connect(&self) -> Result<UnixStream, ClientError> {
        if !self.socket_path.exists() {
            return Err(ClientError::NotRunningNotFound(self.socket_path.clone()));
        }
        let connect = UnixStream::connect(&self.socket_path);
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(classify_connect_error(e, &self.socket_path)),
            Err(_) => Err(ClientError::TimedOut),
        }
    }
}

fn classify_connect_error(e: std::io::Error, path: &Path) -> ClientError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ClientError::NotRunningNotFound(path.to_path_buf()),
        std::io::ErrorKind::ConnectionRefused => ClientError::NotRunningRefused,
        _ => ClientError::Protocol(ProtocolError::Io(e)),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
