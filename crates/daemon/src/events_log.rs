// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event log sink: newline-delimited JSON history of supervisor activity.

use atari_core::{EventRouter, RouterError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

/// Maximum events.log size before rotation (10 MiB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated files to keep (events.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the events log if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `events.log` → `events.log.1` → `.2` → `.3`, deleting the
/// oldest. Best-effort: rotation failures are ignored so the supervisor
/// still starts.
pub fn rotate_if_needed(path: &Path) {
    let size = match std::fs::metadata(path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(path, format!("{log_str}.1"));
}

/// Subscribe to the router and append every event as one JSON line.
///
/// The task ends when the router closes. The subscriber's delivery buffer
/// bounds how far the sink may fall behind; overflow drops events rather
/// than stalling producers.
pub fn spawn_sink(router: &EventRouter, path: PathBuf) -> Result<JoinHandle<()>, RouterError> {
    rotate_if_needed(&path);
    let mut sub = router.subscribe()?;

    Ok(tokio::spawn(async move {
        let mut file = match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "cannot open events log");
                return;
            }
        };

        while let Some(event) = sub.recv().await {
            let line = match serde_json::to_string(&event) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "unserializable event skipped");
                    continue;
                }
            };
            if let Err(e) = writeln!(file, "{line}") {
                tracing::warn!(error = %e, "events log write failed");
            }
        }
        tracing::debug!("events log sink stopped");
    }))
}

#[cfg(test)]
#[path = "events_log_tests.rs"]
mod tests;
