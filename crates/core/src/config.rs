// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor configuration.
//!
//! Defaults are compiled in; a TOML overlay may be loaded from
//! `$XDG_CONFIG_HOME/atari/config.toml` and then from
//! `<project>/.atari/config.toml`; finally a curated set of `ATARI_*`
//! environment variables overrides individual keys.

use crate::work::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
}

/// Session binary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Session binary to spawn.
    pub binary: String,
    /// Extra arguments appended after the fixed flags.
    pub extra_args: Vec<String>,
    /// Optional `--max-turns` cap for primary sessions.
    pub max_turns: Option<u32>,
    /// Total wall-time budget enforced by the watchdog.
    pub timeout_ms: u64,
    /// Cap on captured diagnostic-stream bytes.
    pub stderr_cap_bytes: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            binary: "claude".to_string(),
            extra_args: Vec::new(),
            max_turns: None,
            timeout_ms: 60 * 60 * 1000,
            stderr_cap_bytes: 64 * 1024,
        }
    }
}

impl SessionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Work queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkQueueConfig {
    pub poll_interval_ms: u64,
    /// Only select beads carrying this label.
    pub label: Option<String>,
    /// Only select beads under this parent.
    pub parent: Option<String>,
    /// Never select beads carrying any of these labels.
    pub exclude_labels: Vec<String>,
    /// Wrap up the current session when a higher-priority bead appears.
    pub eager_switch: bool,
}

impl Default for WorkQueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            label: None,
            parent: None,
            exclude_labels: Vec::new(),
            eager_switch: false,
        }
    }
}

impl WorkQueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Failure backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    pub initial_ms: u64,
    pub multiplier: f64,
    pub max_ms: u64,
    pub max_failures: u32,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_ms: 60_000,
            multiplier: 2.0,
            max_ms: 60 * 60 * 1000,
            max_failures: 5,
        }
    }
}

impl BackoffSettings {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial: Duration::from_millis(self.initial_ms),
            multiplier: self.multiplier,
            max: Duration::from_millis(self.max_ms),
            max_failures: self.max_failures,
        }
    }
}

/// Follow-up verification session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUpConfig {
    pub enabled: bool,
    pub max_turns: u32,
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_turns: 10,
        }
    }
}

/// Prompt templates. See [`crate::template`] for the token set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub work: String,
    pub wrap_up: String,
    pub follow_up: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            work: "\
You are working on bead {BeadID}: {BeadTitle}

{BeadDescription}

When the work is complete and verified, close the bead with:
br close {BeadID} --reason \"<one-line summary>\"
"
            .to_string(),
            wrap_up: "\
Wrap up now: commit any work in progress on {BeadID}, note remaining steps \
in the bead, and stop.
"
            .to_string(),
            follow_up: "\
Verify that bead {BeadID} ({BeadTitle}) is complete. If it is, close it with \
`br close {BeadID} --reason \"<summary>\"`; otherwise finish the remaining \
work first.
"
            .to_string(),
        }
    }
}

/// Ticket tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeadsConfig {
    /// Ticket CLI binary.
    pub binary: String,
    /// Bead JSONL file, relative to the project root.
    pub file: String,
}

impl Default for BeadsConfig {
    fn default() -> Self {
        Self {
            binary: "br".to_string(),
            file: ".beads/issues.jsonl".to_string(),
        }
    }
}

/// Daemon socket and timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Socket filename inside the state directory.
    pub socket: String,
    /// Per-connection read deadline.
    pub read_timeout_ms: u64,
    /// Client connect/call timeout.
    pub client_timeout_ms: u64,
    /// Router delivery-buffer capacity per subscriber.
    pub router_capacity: usize,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            socket: "atari.sock".to_string(),
            read_timeout_ms: 30_000,
            client_timeout_ms: 5_000,
            router_capacity: 256,
        }
    }
}

impl DaemonSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client_timeout_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionSettings,
    pub workqueue: WorkQueueConfig,
    pub backoff: BackoffSettings,
    pub follow_up: FollowUpConfig,
    pub prompts: PromptsConfig,
    pub beads: BeadsConfig,
    pub daemon: DaemonSettings,
}

impl Config {
    /// Load configuration for a project: defaults, then the global overlay,
    /// then the project overlay, then `ATARI_*` environment overrides.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(global) = global_config_path() {
            config = config.overlay(&global)?;
        }
        let project = project_root.join(".atari").join("config.toml");
        config = config.overlay(&project)?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Merge a TOML file over this configuration if it exists.
    fn overlay(self, path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(self);
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        // Serialize the current config, splice the file's tables over it,
        // and decode the merged document. Absent keys keep their values.
        let mut base = toml::Table::try_from(&self)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), toml_ser_to_de(e)))?;
        let over: toml::Table =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        merge_tables(&mut base, over);
        base.try_into()
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Apply the curated `ATARI_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_string("ATARI_SESSION_BINARY") {
            self.session.binary = v;
        }
        if let Some(v) = env_parse::<u64>("ATARI_SESSION_TIMEOUT_MS") {
            self.session.timeout_ms = v;
        }
        if let Some(v) = env_parse::<u32>("ATARI_SESSION_MAX_TURNS") {
            self.session.max_turns = Some(v);
        }
        if let Some(v) = env_parse::<u64>("ATARI_POLL_MS") {
            self.workqueue.poll_interval_ms = v;
        }
        if let Some(v) = env_string("ATARI_LABEL") {
            self.workqueue.label = Some(v);
        }
        if let Some(v) = env_parse::<bool>("ATARI_EAGER_SWITCH") {
            self.workqueue.eager_switch = v;
        }
        if let Some(v) = env_parse::<u64>("ATARI_BACKOFF_INITIAL_MS") {
            self.backoff.initial_ms = v;
        }
        if let Some(v) = env_parse::<u64>("ATARI_BACKOFF_MAX_MS") {
            self.backoff.max_ms = v;
        }
        if let Some(v) = env_parse::<f64>("ATARI_BACKOFF_MULTIPLIER") {
            self.backoff.multiplier = v;
        }
        if let Some(v) = env_parse::<u32>("ATARI_MAX_FAILURES") {
            self.backoff.max_failures = v;
        }
        if let Some(v) = env_string("ATARI_BEADS_BIN") {
            self.beads.binary = v;
        }
        if let Some(v) = env_string("ATARI_BEAD_FILE") {
            self.beads.file = v;
        }
    }
}

fn env_string(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

/// `$XDG_CONFIG_HOME/atari/config.toml`, or `~/.config/atari/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Some(PathBuf::from(xdg).join("atari").join("config.toml"));
        }
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config/atari/config.toml"))
}

/// Recursive table merge: overlay scalars replace, overlay tables recurse.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(over_table)) => {
                merge_tables(base_table, over_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// A serialize-side error can only come from a malformed base config,
/// which cannot happen for `Config`; map it through the de error type the
/// caller reports.
fn toml_ser_to_de(e: toml::ser::Error) -> toml::de::Error {
    serde::de::Error::custom(e.to_string())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
