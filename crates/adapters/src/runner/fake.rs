// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted runner for tests.

use super::{
    ChildHandle, CommandOutput, CommandSpec, ExitInfo, PipeReader, PipeWriter, ProcessRunner,
    RunnerError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};

/// A [`ProcessRunner`] serving scripted responses.
///
/// `output` calls pop from the queued outputs, falling back to the default
/// output when the queue is empty; `spawn` calls pop scripted children.
/// Every call is recorded for assertions.
#[derive(Default)]
pub struct FakeRunner {
    outputs: Mutex<VecDeque<CommandOutput>>,
    keyed_outputs: Mutex<std::collections::HashMap<String, VecDeque<CommandOutput>>>,
    keyed_defaults: Mutex<std::collections::HashMap<String, CommandOutput>>,
    default_output: Mutex<Option<CommandOutput>>,
    children: Mutex<VecDeque<FakeChild>>,
    calls: Mutex<Vec<CommandSpec>>,
    fail_spawns: AtomicBool,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one `output` response.
    pub fn push_output(&self, output: CommandOutput) {
        self.outputs.lock().push_back(output);
    }

    /// Queue one `output` response for commands whose first argument is
    /// `key` (e.g. "ready", "update"). Keyed responses win over the
    /// global queue.
    pub fn push_output_for(&self, key: &str, output: CommandOutput) {
        self.keyed_outputs
            .lock()
            .entry(key.to_string())
            .or_default()
            .push_back(output);
    }

    /// Serve this response for every command whose first argument is
    /// `key` once its keyed queue is empty.
    pub fn set_default_for(&self, key: &str, output: CommandOutput) {
        self.keyed_defaults.lock().insert(key.to_string(), output);
    }

    /// Serve this response whenever no queue or keyed default matches.
    pub fn set_default_output(&self, output: CommandOutput) {
        *self.default_output.lock() = Some(output);
    }

    /// Convenience: successful output with the given stdout.
    pub fn ok_output(stdout: &str) -> CommandOutput {
        CommandOutput {
            exit: ExitInfo::ok(),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        }
    }

    /// Convenience: failed output with the given exit code and stderr.
    pub fn failed_output(code: i32, stderr: &str) -> CommandOutput {
        CommandOutput {
            exit: ExitInfo::failed(code),
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    /// Queue one scripted child for `spawn`.
    pub fn push_child(&self, child: FakeChild) {
        self.children.lock().push_back(child);
    }

    /// Make subsequent `spawn` calls fail.
    pub fn fail_spawns(&self) {
        self.fail_spawns.store(true, Ordering::SeqCst);
    }

    /// All command specs seen so far.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn output(
        &self,
        spec: CommandSpec,
        _timeout: Duration,
    ) -> Result<CommandOutput, RunnerError> {
        self.calls.lock().push(spec.clone());
        if let Some(key) = spec.args.first() {
            if let Some(queue) = self.keyed_outputs.lock().get_mut(key) {
                if let Some(output) = queue.pop_front() {
                    return Ok(output);
                }
            }
            if let Some(output) = self.keyed_defaults.lock().get(key) {
                return Ok(output.clone());
            }
        }
        if let Some(output) = self.outputs.lock().pop_front() {
            return Ok(output);
        }
        if let Some(output) = self.default_output.lock().clone() {
            return Ok(output);
        }
        Err(RunnerError::Spawn {
            program: spec.display(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no scripted output"),
        })
    }

    fn spawn(&self, spec: CommandSpec) -> Result<Box<dyn ChildHandle>, RunnerError> {
        self.calls.lock().push(spec.clone());
        if self.fail_spawns.load(Ordering::SeqCst) {
            return Err(RunnerError::Spawn {
                program: spec.display(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted spawn failure"),
            });
        }
        match self.children.lock().pop_front() {
            Some(child) => Ok(Box::new(child)),
            None => Err(RunnerError::Spawn {
                program: spec.display(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no scripted child"),
            }),
        }
    }
}

struct FakeExit {
    exit: Mutex<Option<ExitInfo>>,
    killed: AtomicBool,
    /// Writer half of the child's stdout; dropping it signals EOF, which
    /// is what a real exit or kill does to the pipe.
    stdout_tx: Mutex<Option<DuplexStream>>,
}

impl FakeExit {
    fn close_stdout(&self) {
        self.stdout_tx.lock().take();
    }
}

/// Test-side view of a [`FakeChild`]: what it was sent, whether it was
/// killed, and levers to feed output and make it exit.
#[derive(Clone)]
pub struct FakeChildControl {
    stdin: Arc<Mutex<Vec<u8>>>,
    stdin_closed: Arc<AtomicBool>,
    state: Arc<FakeExit>,
}

impl FakeChildControl {
    /// Everything written to the child's input stream so far.
    pub fn stdin_bytes(&self) -> Vec<u8> {
        self.stdin.lock().clone()
    }

    pub fn stdin_str(&self) -> String {
        String::from_utf8_lossy(&self.stdin.lock()).into_owned()
    }

    pub fn stdin_closed(&self) -> bool {
        self.stdin_closed.load(Ordering::SeqCst)
    }

    pub fn was_killed(&self) -> bool {
        self.state.killed.load(Ordering::SeqCst)
    }

    /// Feed bytes to the child's stdout (hanging children only).
    pub async fn write_stdout(&self, data: &str) {
        let taken = self.state.stdout_tx.lock().take();
        let Some(mut writer) = taken else {
            return;
        };
        let _ = writer.write_all(data.as_bytes()).await;
        let _ = writer.flush().await;
        *self.state.stdout_tx.lock() = Some(writer);
    }

    /// Make the child report the given exit on the next `try_wait`. Also
    /// closes its stdout, as a real exit would.
    pub fn exit_with(&self, exit: ExitInfo) {
        *self.state.exit.lock() = Some(exit);
        self.state.close_stdout();
    }
}

/// Scripted child: captured stdin, scripted stdout, and an exit controlled
/// by the test (or by `start_kill`).
pub struct FakeChild {
    stdout: Option<PipeReader>,
    stderr: Option<PipeReader>,
    stdin: Option<PipeWriter>,
    state: Arc<FakeExit>,
}

impl FakeChild {
    /// Child whose stdout streams the given bytes, then EOF, and which
    /// reports `exit` as soon as it is polled.
    pub fn exits(stdout: &str, exit: ExitInfo) -> (Self, FakeChildControl) {
        let (child, control) = Self::build(Some(stdout));
        control.exit_with(exit);
        (child, control)
    }

    /// Child whose stdout stays open (fed via the control) and which never
    /// exits until killed or told to.
    pub fn hanging() -> (Self, FakeChildControl) {
        Self::build(None)
    }

    fn build(preset_stdout: Option<&str>) -> (Self, FakeChildControl) {
        let stdin = Arc::new(Mutex::new(Vec::new()));
        let stdin_closed = Arc::new(AtomicBool::new(false));

        let (stdout, stdout_tx): (PipeReader, Option<DuplexStream>) = match preset_stdout {
            Some(content) => (Box::new(Cursor::new(content.as_bytes().to_vec())), None),
            None => {
                let (tx, rx) = tokio::io::duplex(1024 * 1024);
                (Box::new(rx), Some(tx))
            }
        };

        let state = Arc::new(FakeExit {
            exit: Mutex::new(None),
            killed: AtomicBool::new(false),
            stdout_tx: Mutex::new(stdout_tx),
        });
        let control = FakeChildControl {
            stdin: Arc::clone(&stdin),
            stdin_closed: Arc::clone(&stdin_closed),
            state: Arc::clone(&state),
        };
        let child = Self {
            stdout: Some(stdout),
            stderr: Some(Box::new(Cursor::new(Vec::new()))),
            stdin: Some(Box::new(SharedWriter {
                buf: stdin,
                closed: stdin_closed,
            })),
            state,
        };
        (child, control)
    }

    /// Replace the child's stderr bytes.
    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.stderr = Some(Box::new(Cursor::new(stderr.as_bytes().to_vec())));
        self
    }
}

impl ChildHandle for FakeChild {
    fn take_stdin(&mut self) -> Option<PipeWriter> {
        self.stdin.take()
    }

    fn take_stdout(&mut self) -> Option<PipeReader> {
        self.stdout.take()
    }

    fn take_stderr(&mut self) -> Option<PipeReader> {
        self.stderr.take()
    }

    fn try_wait(&mut self) -> Result<Option<ExitInfo>, RunnerError> {
        if self.state.killed.load(Ordering::SeqCst) {
            return Ok(Some(
                (*self.state.exit.lock()).unwrap_or_else(ExitInfo::killed),
            ));
        }
        Ok(*self.state.exit.lock())
    }

    fn start_kill(&mut self) -> Result<(), RunnerError> {
        self.state.killed.store(true, Ordering::SeqCst);
        self.state.close_stdout();
        Ok(())
    }

    fn id(&self) -> Option<u32> {
        Some(4242)
    }
}

/// AsyncWrite into a shared buffer, recording shutdown.
struct SharedWriter {
    buf: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
}

impl tokio::io::AsyncWrite for SharedWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<Result<usize, std::io::Error>> {
        self.buf.lock().extend_from_slice(data);
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), std::io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        self.closed.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}
