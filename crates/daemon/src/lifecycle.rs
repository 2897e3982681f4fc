// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: single-instance lock, stale-state cleanup, metadata
//! and crash-recovery snapshot.

use crate::paths::StatePaths;
use atari_core::QueueStats;
use atari_engine::QueueSnapshot;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("supervisor already running (pid {pid})")]
    AlreadyRunning { pid: String },

    #[error("failed to acquire lock: {0}")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, #[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Held for the supervisor's lifetime; the advisory lock releases when the
/// file handle drops.
#[derive(Debug)]
pub struct LockGuard {
    // NOTE(lifetime): held to maintain the exclusive file lock
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Release the lock and remove the lock file (orderly shutdown).
    pub fn release(self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(error = %e, "failed to remove lock file");
        }
    }
}

/// Acquire the exclusive single-instance lock and record our PID.
///
/// The file is opened without truncation so a failed acquisition does not
/// wipe the running supervisor's PID; truncation happens only once the
/// lock is held.
pub fn acquire_lock(path: &Path) -> Result<LockGuard, LifecycleError> {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    if let Err(e) = file.try_lock_exclusive() {
        if e.kind() == std::io::ErrorKind::WouldBlock {
            let pid = std::fs::read_to_string(path)
                .unwrap_or_default()
                .trim()
                .to_string();
            return Err(LifecycleError::AlreadyRunning { pid });
        }
        return Err(LifecycleError::LockFailed(e));
    }

    let mut file = file;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()?;
    Ok(LockGuard {
        file,
        path: path.to_path_buf(),
    })
}

/// Check whether a process with the given PID exists (null signal probe).
pub fn process_exists(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Read the PID recorded in a lock file.
pub fn read_lock_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()?
        .trim()
        .parse::<u32>()
        .ok()
}

/// Remove leftover lock and socket files from a dead supervisor.
///
/// The recorded PID is the authoritative liveness probe; both the lock
/// file and the socket file can be stale.
pub fn cleanup_stale(paths: &StatePaths) {
    let Some(pid) = read_lock_pid(&paths.lock_path) else {
        if paths.lock_path.exists() {
            // Unreadable PID: treat the lock as stale.
            let _ = std::fs::remove_file(&paths.lock_path);
            let _ = std::fs::remove_file(&paths.socket_path);
        }
        return;
    };
    if process_exists(pid) {
        return;
    }
    info!(pid, "removing stale lock and socket from dead supervisor");
    let _ = std::fs::remove_file(&paths.lock_path);
    let _ = std::fs::remove_file(&paths.socket_path);
}

/// Remove any stale socket file and bind a fresh listener with owner-only
/// permissions.
pub fn bind_socket(path: &Path) -> Result<UnixListener, LifecycleError> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let listener =
        UnixListener::bind(path).map_err(|e| LifecycleError::BindFailed(path.to_path_buf(), e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(listener)
}

/// Companion metadata written next to the lock so later client
/// invocations can locate the running supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonMeta {
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub start_time_ms: u64,
    pub pid: u32,
}

impl DaemonMeta {
    pub fn write(&self, path: &Path) -> Result<(), LifecycleError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, LifecycleError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Crash-recovery snapshot of work-queue bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub stats: QueueStats,
    pub queue: QueueSnapshot,
}

/// Persist the snapshot; best-effort, failures are logged.
pub fn save_state_snapshot(path: &Path, snapshot: &StateSnapshot) {
    let json = match serde_json::to_string_pretty(snapshot) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "failed to serialize state snapshot");
            return;
        }
    };
    if let Err(e) = std::fs::write(path, json) {
        warn!(error = %e, "failed to write state snapshot");
    }
}

/// Load the snapshot if present and parseable; anything else starts fresh.
pub fn load_state_snapshot(path: &Path) -> Option<StateSnapshot> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(error = %e, "ignoring unparseable state snapshot");
            None
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
