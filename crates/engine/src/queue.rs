// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work queue: selection, filtering and failure backoff.
//!
//! The ready set comes from the ticket CLI on every poll; this module
//! owns only the per-bead bookkeeping (attempts, backoff windows,
//! terminal states) layered on top of it.

use atari_core::work::{backoff_delay, BackoffPolicy, Terminal, WorkItem};
use atari_core::config::WorkQueueConfig;
use atari_adapters::ReadyBead;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Selection-set filter from configuration.
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    pub label: Option<String>,
    pub parent: Option<String>,
    pub exclude_labels: Vec<String>,
}

impl QueueFilter {
    pub fn from_config(config: &WorkQueueConfig) -> Self {
        Self {
            label: config.label.clone(),
            parent: config.parent.clone(),
            exclude_labels: config.exclude_labels.clone(),
        }
    }

    fn admits(&self, bead: &ReadyBead) -> bool {
        if let Some(label) = &self.label {
            if !bead.labels.iter().any(|l| l == label) {
                return false;
            }
        }
        if let Some(parent) = &self.parent {
            if bead.parent.as_deref() != Some(parent.as_str()) {
                return false;
            }
        }
        if bead
            .labels
            .iter()
            .any(|l| self.exclude_labels.iter().any(|x| x == l))
        {
            return false;
        }
        true
    }
}

/// Outcome of recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Retry later, once the backoff window passes.
    Backoff {
        attempts: u32,
        next_eligible_at_ms: u64,
    },
    /// The failure ceiling was reached; no further attempts this lifetime.
    Abandoned { attempts: u32 },
}

/// Serializable queue state for the crash-recovery snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub items: Vec<WorkItem>,
}

/// Per-bead bookkeeping over the externally provided ready set.
pub struct WorkQueue {
    policy: BackoffPolicy,
    filter: QueueFilter,
    items: HashMap<String, WorkItem>,
}

impl WorkQueue {
    pub fn new(policy: BackoffPolicy, filter: QueueFilter) -> Self {
        Self {
            policy,
            filter,
            items: HashMap::new(),
        }
    }

    /// Restore bookkeeping from a crash-recovery snapshot.
    pub fn restore(&mut self, snapshot: QueueSnapshot) {
        for item in snapshot.items {
            self.items.insert(item.id.clone(), item);
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let mut items: Vec<_> = self.items.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        QueueSnapshot { items }
    }

    /// Track every admitted ready bead, creating work items on first
    /// sight and refreshing title/priority on later ones.
    pub fn observe(&mut self, ready: &[ReadyBead]) {
        for bead in ready.iter().filter(|b| self.filter.admits(b)) {
            match self.items.get_mut(&bead.id) {
                Some(item) => {
                    item.title = bead.title.clone();
                    item.priority = bead.priority;
                }
                None => {
                    self.items.insert(
                        bead.id.clone(),
                        WorkItem::new(&bead.id, &bead.title, bead.priority),
                    );
                }
            }
        }
    }

    /// Pick the next bead: admitted, not terminal, not in backoff, lowest
    /// (priority, id).
    pub fn select<'a>(&self, ready: &'a [ReadyBead], now_ms: u64) -> Option<&'a ReadyBead> {
        ready
            .iter()
            .filter(|b| self.filter.admits(b))
            .filter(|b| self.selectable(&b.id, now_ms))
            .min_by(|a, b| (a.priority, &a.id).cmp(&(b.priority, &b.id)))
    }

    /// Would the given ready set preempt the currently running bead?
    /// True only for a strictly higher-priority candidate.
    pub fn preempts(&self, current_id: &str, current_priority: i64, ready: &[ReadyBead], now_ms: u64) -> bool {
        self.select(ready, now_ms)
            .map(|best| best.id != current_id && best.priority < current_priority)
            .unwrap_or(false)
    }

    fn selectable(&self, id: &str, now_ms: u64) -> bool {
        match self.items.get(id) {
            Some(item) => item.is_active() && !item.in_backoff(now_ms),
            None => true,
        }
    }

    /// Count of beads ever seen as ready (including terminal ones).
    pub fn total_seen(&self) -> u64 {
        self.items.len() as u64
    }

    /// Count of active beads currently hidden by a backoff window.
    pub fn in_backoff(&self, now_ms: u64) -> u64 {
        self.items.values().filter(|i| i.in_backoff(now_ms)).count() as u64
    }

    /// Record the start of an iteration; returns the attempt number.
    pub fn note_attempt(&mut self, id: &str, now_ms: u64) -> u32 {
        let item = self
            .items
            .entry(id.to_string())
            .or_insert_with(|| WorkItem::new(id, "", 0));
        item.note_attempt(now_ms);
        item.attempts
    }

    /// Record a failed attempt: schedule the next eligibility, or abandon
    /// once the failure ceiling is reached.
    pub fn record_failure(&mut self, id: &str, now_ms: u64) -> FailureOutcome {
        let policy = self.policy;
        let item = self
            .items
            .entry(id.to_string())
            .or_insert_with(|| WorkItem::new(id, "", 0));

        let next = now_ms + backoff_delay(&policy, item.attempts).as_millis() as u64;
        // next_eligible_at is non-decreasing between failures of one bead.
        item.next_eligible_at_ms = item.next_eligible_at_ms.max(next);

        if item.attempts >= policy.max_failures {
            item.terminal = Terminal::Abandoned;
            return FailureOutcome::Abandoned {
                attempts: item.attempts,
            };
        }
        FailureOutcome::Backoff {
            attempts: item.attempts,
            next_eligible_at_ms: item.next_eligible_at_ms,
        }
    }

    /// Record a successful iteration: terminal completed.
    pub fn record_success(&mut self, id: &str) {
        if let Some(item) = self.items.get_mut(id) {
            item.terminal = Terminal::Completed;
            item.next_eligible_at_ms = 0;
        }
    }

    /// Clear backoff state. With an id, also revives an abandoned bead;
    /// without, clears the window for every active bead in backoff.
    pub fn clear_backoff(&mut self, id: Option<&str>, now_ms: u64) -> usize {
        match id {
            Some(id) => match self.items.get_mut(id) {
                Some(item) if item.terminal == Terminal::Abandoned || item.in_backoff(now_ms) => {
                    item.terminal = Terminal::None;
                    item.attempts = 0;
                    item.next_eligible_at_ms = 0;
                    1
                }
                _ => 0,
            },
            None => {
                let mut cleared = 0;
                for item in self.items.values_mut() {
                    if item.in_backoff(now_ms) {
                        item.next_eligible_at_ms = 0;
                        cleared += 1;
                    }
                }
                cleared
            }
        }
    }

    pub fn attempts(&self, id: &str) -> u32 {
        self.items.get(id).map(|i| i.attempts).unwrap_or(0)
    }

    pub fn terminal(&self, id: &str) -> Terminal {
        self.items
            .get(id)
            .map(|i| i.terminal)
            .unwrap_or(Terminal::None)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
