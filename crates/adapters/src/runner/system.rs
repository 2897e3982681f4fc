// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real subprocess runner on `tokio::process`.

use super::{
    ChildHandle, CommandOutput, CommandSpec, ExitInfo, PipeReader, PipeWriter, ProcessRunner,
    RunnerError,
};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Runner backed by the operating system.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn output(
        &self,
        spec: CommandSpec,
        timeout: Duration,
    ) -> Result<CommandOutput, RunnerError> {
        let mut cmd = Self::command(&spec);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // The child is killed automatically if the timeout elapses, via the
        // tokio Child drop implementation.
        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(CommandOutput {
                exit: ExitInfo {
                    success: output.status.success(),
                    code: output.status.code(),
                },
                stdout: output.stdout,
                stderr: output.stderr,
            }),
            Ok(Err(source)) => Err(RunnerError::Spawn {
                program: spec.display(),
                source,
            }),
            Err(_elapsed) => Err(RunnerError::TimedOut {
                description: spec.display(),
                timeout,
            }),
        }
    }

    fn spawn(&self, spec: CommandSpec) -> Result<Box<dyn ChildHandle>, RunnerError> {
        let mut cmd = Self::command(&spec);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            program: spec.display(),
            source,
        })?;
        Ok(Box::new(SystemChild { child }))
    }
}

struct SystemChild {
    child: Child,
}

impl ChildHandle for SystemChild {
    fn take_stdin(&mut self) -> Option<PipeWriter> {
        self.child
            .stdin
            .take()
            .map(|s| Box::new(s) as PipeWriter)
    }

    fn take_stdout(&mut self) -> Option<PipeReader> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as PipeReader)
    }

    fn take_stderr(&mut self) -> Option<PipeReader> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as PipeReader)
    }

    fn try_wait(&mut self) -> Result<Option<ExitInfo>, RunnerError> {
        Ok(self.child.try_wait()?.map(|status| ExitInfo {
            success: status.success(),
            code: status.code(),
        }))
    }

    fn start_kill(&mut self) -> Result<(), RunnerError> {
        match self.child.start_kill() {
            Ok(()) => Ok(()),
            // Already reaped: nothing left to kill.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(RunnerError::Io(e)),
        }
    }

    fn id(&self) -> Option<u32> {
        self.child.id()
    }
}
