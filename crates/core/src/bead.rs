// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bead (ticket) snapshots and whole-file index handling.
//!
//! The external ticket tool stores beads as newline-delimited JSON.
//! Loading always re-parses the whole file; diffing two indexes yields the
//! change events published by the watcher. No cursor or offset is tracked,
//! so truncate-and-rewrite updates behave the same as appends.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Immutable five-field record for one bead.
///
/// Two snapshots are equal iff all five fields match; additional fields in
/// the source record are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeadSnapshot {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub issue_type: String,
}

impl BeadSnapshot {
    /// Parse one JSONL record. Returns `None` for malformed lines and for
    /// records with an empty id.
    pub fn from_json_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let snapshot: Self = match serde_json::from_str(trimmed) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed bead record");
                return None;
            }
        };
        if snapshot.id.is_empty() {
            tracing::debug!("skipping bead record with empty id");
            return None;
        }
        Some(snapshot)
    }
}

/// Mapping from bead id to its latest snapshot. Rebuilt wholesale on each
/// file change, never mutated in place.
pub type BeadIndex = HashMap<String, BeadSnapshot>;

/// One entry of an index diff. `before` absent signals creation, `after`
/// absent signals deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct BeadChange {
    pub before: Option<BeadSnapshot>,
    pub after: Option<BeadSnapshot>,
}

/// Load a bead index from a JSONL file.
///
/// Per-line parse errors are skipped (logged at debug); an unreadable file
/// is an error for the caller to handle.
pub fn load_index(path: &Path) -> std::io::Result<BeadIndex> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let mut index = BeadIndex::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(snapshot) = BeadSnapshot::from_json_line(&line) {
            index.insert(snapshot.id.clone(), snapshot);
        }
    }
    Ok(index)
}

/// Diff two indexes into change entries, ordered by bead id for
/// deterministic emission.
pub fn diff_indexes(old: &BeadIndex, new: &BeadIndex) -> Vec<BeadChange> {
    let mut changes = Vec::new();

    for (id, after) in new {
        match old.get(id) {
            None => changes.push(BeadChange {
                before: None,
                after: Some(after.clone()),
            }),
            Some(before) if before != after => changes.push(BeadChange {
                before: Some(before.clone()),
                after: Some(after.clone()),
            }),
            Some(_) => {}
        }
    }

    for (id, before) in old {
        if !new.contains_key(id) {
            changes.push(BeadChange {
                before: Some(before.clone()),
                after: None,
            });
        }
    }

    changes.sort_by(|a, b| change_id(a).cmp(change_id(b)));
    changes
}

fn change_id(change: &BeadChange) -> &str {
    change
        .after
        .as_ref()
        .or(change.before.as_ref())
        .map(|s| s.id.as_str())
        .unwrap_or_default()
}

/// Statuses the supervisor treats as terminally closed.
pub fn is_closed_status(status: &str) -> bool {
    matches!(status, "closed" | "done" | "completed")
}

#[cfg(test)]
#[path = "bead_tests.rs"]
mod tests;
