// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project root discovery and per-project state directory layout.

use atari_core::Config;
use std::path::{Path, PathBuf};

/// Name of the per-project state directory.
pub const STATE_DIR_NAME: &str = ".atari";

/// Markers that identify a project root, in order of preference.
const PROJECT_MARKERS: &[&str] = &[".beads", STATE_DIR_NAME, ".git"];

/// Walk upward from `start` to the first directory containing a project
/// marker. This is how a client invocation started from a subdirectory
/// locates the running supervisor.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        if PROJECT_MARKERS
            .iter()
            .any(|marker| current.join(marker).exists())
        {
            return Some(current.to_path_buf());
        }
        dir = current.parent();
    }
    None
}

/// Resolved filesystem layout under `<project>/.atari/`.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub project_root: PathBuf,
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub events_log_path: PathBuf,
    pub meta_path: PathBuf,
    pub state_json_path: PathBuf,
    pub bead_file: PathBuf,
}

impl StatePaths {
    /// Resolve the state layout for a project. `ATARI_STATE_DIR` overrides
    /// the state directory location (used by tests for isolation).
    pub fn resolve(project_root: &Path, config: &Config) -> Self {
        let state_dir = match std::env::var("ATARI_STATE_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => project_root.join(STATE_DIR_NAME),
        };
        let bead_file = {
            let configured = Path::new(&config.beads.file);
            if configured.is_absolute() {
                configured.to_path_buf()
            } else {
                project_root.join(configured)
            }
        };
        Self {
            project_root: project_root.to_path_buf(),
            socket_path: state_dir.join(&config.daemon.socket),
            lock_path: state_dir.join("lock"),
            log_path: state_dir.join("daemon.log"),
            events_log_path: state_dir.join("events.log"),
            meta_path: state_dir.join("daemon.json"),
            state_json_path: state_dir.join("state.json"),
            bead_file,
            state_dir,
        }
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
