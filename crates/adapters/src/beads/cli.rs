// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket CLI invocation.
//!
//! The supervisor never edits the bead file itself; claims and closes go
//! through the external tool so its bookkeeping stays authoritative. A
//! non-zero exit is a recoverable failure: the controller counts it
//! toward backoff and moves on.

use crate::runner::{CommandSpec, ProcessRunner, RunnerError};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Ticket CLI errors
#[derive(Debug, Error)]
pub enum BeadsCliError {
    #[error("ticket command failed: {0}")]
    Runner(#[from] RunnerError),

    #[error("`{command}` exited {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` returned unparseable JSON: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One entry of the `ready --json` array. Superset of the five snapshot
/// fields; the extras drive queue filtering and prompt expansion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReadyBead {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub issue_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub parent: Option<String>,
}

/// Wrapper around the external ticket binary.
#[derive(Clone)]
pub struct BeadsCli {
    runner: Arc<dyn ProcessRunner>,
    binary: String,
    cwd: PathBuf,
}

impl BeadsCli {
    pub fn new(runner: Arc<dyn ProcessRunner>, binary: impl Into<String>, cwd: PathBuf) -> Self {
        Self {
            runner,
            binary: binary.into(),
            cwd,
        }
    }

    /// `<binary> ready --json`: the currently actionable beads.
    pub async fn ready(&self) -> Result<Vec<ReadyBead>, BeadsCliError> {
        let output = self.run(CommandSpec::new(&self.binary).args(["ready", "--json"])).await?;
        serde_json::from_slice(&output).map_err(|source| BeadsCliError::Decode {
            command: format!("{} ready --json", self.binary),
            source,
        })
    }

    /// `<binary> update <id> --status <status>`: claim or release a bead.
    pub async fn update_status(&self, id: &str, status: &str) -> Result<(), BeadsCliError> {
        self.run(
            CommandSpec::new(&self.binary).args(["update", id, "--status", status]),
        )
        .await
        .map(|_| ())
    }

    /// `<binary> close <id> --reason <text>`.
    pub async fn close(&self, id: &str, reason: &str) -> Result<(), BeadsCliError> {
        self.run(CommandSpec::new(&self.binary).args(["close", id, "--reason", reason]))
            .await
            .map(|_| ())
    }

    async fn run(&self, spec: CommandSpec) -> Result<Vec<u8>, BeadsCliError> {
        let spec = spec.cwd(self.cwd.clone());
        let command = spec.display();
        let output = self
            .runner
            .output(spec, crate::env::beads_command_timeout())
            .await?;
        if !output.exit.success {
            return Err(BeadsCliError::CommandFailed {
                command,
                code: output.exit.code,
                stderr: output.stderr_str().trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
