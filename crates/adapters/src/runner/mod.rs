// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess abstraction.
//!
//! Two shapes of child process are needed: one-shot commands whose output
//! is collected with a timeout (the ticket CLI), and long-lived piped
//! children (the session binary). Both go through [`ProcessRunner`] so
//! tests can substitute a fake.

mod system;
pub use system::SystemRunner;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

/// Boxed pipe to a child's input stream.
pub type PipeWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Boxed pipe from one of a child's output streams.
pub type PipeReader = Box<dyn AsyncRead + Send + Unpin>;

/// Runner errors
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{description} timed out after {}s", timeout.as_secs())]
    TimedOut {
        description: String,
        timeout: Duration,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What to run and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// One-line rendering for logs and error messages.
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

/// Exit disposition of a finished child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub success: bool,
    pub code: Option<i32>,
}

impl ExitInfo {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
        }
    }

    pub fn failed(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
        }
    }

    /// A child that was killed before exiting on its own.
    pub fn killed() -> Self {
        Self {
            success: false,
            code: None,
        }
    }
}

/// Collected output of a one-shot command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit: ExitInfo,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Handle on a spawned, piped child.
///
/// `try_wait`/`start_kill` are synchronous so callers can poll from a loop
/// while other tasks hold only brief locks on the handle.
pub trait ChildHandle: Send {
    fn take_stdin(&mut self) -> Option<PipeWriter>;
    fn take_stdout(&mut self) -> Option<PipeReader>;
    fn take_stderr(&mut self) -> Option<PipeReader>;
    fn try_wait(&mut self) -> Result<Option<ExitInfo>, RunnerError>;
    fn start_kill(&mut self) -> Result<(), RunnerError>;
    fn id(&self) -> Option<u32>;
}

/// Interface for subprocess start/wait/kill.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a command to completion, collecting its output, bounded by
    /// `timeout`. The child is killed if the timeout elapses.
    async fn output(
        &self,
        spec: CommandSpec,
        timeout: Duration,
    ) -> Result<CommandOutput, RunnerError>;

    /// Spawn a child with all three standard streams piped.
    fn spawn(&self, spec: CommandSpec) -> Result<Box<dyn ChildHandle>, RunnerError>;
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
