// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller state and queue statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Drive state of the controller loop.
///
/// Transitions are driven only by the controller loop itself and by
/// external pause/resume/stop requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    Iterating,
    Paused,
    Stopping,
    Stopped,
}

impl ControllerState {
    /// Whether the controller can still pick up work from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopping | Self::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Iterating => "iterating",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters reported by the `status` RPC.
///
/// `iteration`, `total_seen`, `completed`, `failed` and `abandoned` are
/// monotonic; `current_*` reflect the in-flight iteration only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub iteration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_bead: Option<String>,
    pub current_turns: u32,
    pub total_seen: u64,
    pub completed: u64,
    pub failed: u64,
    pub abandoned: u64,
    pub in_backoff: u64,
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
