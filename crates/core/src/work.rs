// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-bead work accounting: attempts, backoff schedule, terminal states.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Terminal disposition of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    None,
    Completed,
    Failed,
    Abandoned,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::None
    }
}

/// Mutable bookkeeping for one bead the supervisor has seen as ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub title: String,
    pub priority: i64,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at_ms: Option<u64>,
    /// Epoch ms before which the item is hidden from selection. Zero means
    /// immediately eligible. Non-decreasing between failures.
    #[serde(default)]
    pub next_eligible_at_ms: u64,
    #[serde(default)]
    pub terminal: Terminal,
}

impl WorkItem {
    pub fn new(id: &str, title: &str, priority: i64) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            priority,
            attempts: 0,
            last_attempt_at_ms: None,
            next_eligible_at_ms: 0,
            terminal: Terminal::None,
        }
    }

    /// Active items are still candidates for selection.
    pub fn is_active(&self) -> bool {
        matches!(self.terminal, Terminal::None)
    }

    pub fn in_backoff(&self, now_ms: u64) -> bool {
        self.is_active() && now_ms < self.next_eligible_at_ms
    }

    /// Record the start of an iteration: attempts increment here, before
    /// the outcome is known.
    pub fn note_attempt(&mut self, now_ms: u64) {
        self.attempts += 1;
        self.last_attempt_at_ms = Some(now_ms);
    }
}

/// Backoff parameters, resolved from configuration.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub max: Duration,
    pub max_failures: u32,
}

/// Delay applied after the `failures`-th consecutive failure:
/// `min(initial * multiplier^(failures-1), max)`.
pub fn backoff_delay(policy: &BackoffPolicy, failures: u32) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    let scaled = policy.initial.as_millis() as f64 * policy.multiplier.powi(failures as i32 - 1);
    let capped = scaled.min(policy.max.as_millis() as f64);
    Duration::from_millis(capped as u64)
}

#[cfg(test)]
#[path = "work_tests.rs"]
mod tests;
