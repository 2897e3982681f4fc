// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for daemon communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + one JSON object per
//! direction. Exactly one response per request; the request id is echoed.

#[path = "protocol_wire.rs"]
mod wire;
pub use wire::{
    decode, encode, read_message, read_request, write_message, write_response, ProtocolError,
    MAX_MESSAGE_SIZE,
};

use atari_core::QueueStats;
use atari_engine::StatusSnapshot;
use serde::{Deserialize, Serialize};

/// Request from client to daemon: `{method, params, id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: u64,
}

impl Request {
    pub fn new(method: &str, params: serde_json::Value, id: u64) -> Self {
        Self {
            method: method.to_string(),
            params,
            id,
        }
    }
}

/// Response from daemon to client: `{result, error, id}`. `error` is the
/// empty string on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error: String,
    pub id: u64,
}

impl Response {
    pub fn ok(id: u64, result: serde_json::Value) -> Self {
        Self {
            result,
            error: String::new(),
            id,
        }
    }

    pub fn err(id: u64, error: impl Into<String>) -> Self {
        Self {
            result: serde_json::Value::Null,
            error: error.into(),
            id,
        }
    }

    pub fn is_err(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Parameters of the `stop` method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopParams {
    #[serde(default)]
    pub force: bool,
}

/// Parameters of the `retry` method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryParams {
    #[serde(default)]
    pub bead_id: Option<String>,
}

/// Result of the `status` method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResult {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_bead: Option<String>,
    pub uptime_secs: u64,
    pub start_time_ms: u64,
    pub stats: QueueStats,
}

impl From<StatusSnapshot> for StatusResult {
    fn from(snapshot: StatusSnapshot) -> Self {
        Self {
            status: snapshot.state.to_string(),
            current_bead: snapshot.current_bead,
            uptime_secs: snapshot.uptime_ms / 1000,
            start_time_ms: snapshot.start_time_ms,
            stats: snapshot.stats,
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
