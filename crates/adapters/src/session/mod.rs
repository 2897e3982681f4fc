// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session binary lifecycle.
//!
//! A [`SessionManager`] supervises exactly one session-binary process: it
//! wires the prompt onto stdin (leaving the pipe open for a later wrap-up
//! injection), hands stdout to the stream parser, captures stderr into a
//! bounded buffer, and runs an activity watchdog that force-kills a
//! session whose output has gone silent past the configured timeout.

pub mod limited;
pub mod parser;

use crate::runner::{
    ChildHandle, CommandSpec, ExitInfo, PipeReader, PipeWriter, ProcessRunner, RunnerError,
};
use atari_core::config::SessionSettings;
use atari_core::{Clock, Event, EventKind, EventRouter, SystemClock};
use self::limited::LimitedWriter;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Notify;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already started")]
    AlreadyStarted,

    #[error("session not started")]
    NotStarted,

    #[error("wrap-up already sent")]
    WrapUpAlreadySent,

    #[error("session has no input pipe")]
    NoStdin,

    #[error("failed to spawn session: {0}")]
    Spawn(#[from] RunnerError),

    #[error("failed to write session input: {0}")]
    Stdin(#[source] std::io::Error),
}

/// Resolved per-session parameters.
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub binary: String,
    pub extra_args: Vec<String>,
    pub max_turns: Option<u32>,
    pub timeout: Duration,
    pub stderr_cap: usize,
}

impl SessionSpec {
    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            extra_args: settings.extra_args.clone(),
            max_turns: settings.max_turns,
            timeout: settings.timeout(),
            stderr_cap: settings.stderr_cap_bytes,
        }
    }

    /// Override the turn cap (used for bounded follow-up sessions).
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    fn command(&self) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.binary).args([
            "--print",
            "--verbose",
            "--output-format",
            "stream-json",
        ]);
        if let Some(n) = self.max_turns {
            spec = spec.arg("--max-turns").arg(n.to_string());
        }
        spec.args(self.extra_args.iter().cloned())
    }
}

/// Shared watchdog heartbeat: epoch ms of the last observed activity.
#[derive(Clone)]
pub struct ActivityHandle {
    last_ms: Arc<AtomicU64>,
}

impl ActivityHandle {
    pub fn new() -> Self {
        Self {
            last_ms: Arc::new(AtomicU64::new(SystemClock.epoch_ms())),
        }
    }

    pub fn note(&self) {
        self.last_ms.store(SystemClock.epoch_ms(), Ordering::SeqCst);
    }

    pub fn last_ms(&self) -> u64 {
        self.last_ms.load(Ordering::SeqCst)
    }

    /// Directly set the heartbeat. Intended for tests.
    pub fn set_last_ms(&self, ms: u64) {
        self.last_ms.store(ms, Ordering::SeqCst);
    }
}

impl Default for ActivityHandle {
    fn default() -> Self {
        Self::new()
    }
}

struct SessionInner {
    spec: SessionSpec,
    router: EventRouter,
    runner: Arc<dyn ProcessRunner>,
    child: Mutex<Option<Box<dyn ChildHandle>>>,
    stdin: Mutex<Option<PipeWriter>>,
    stderr: LimitedWriter,
    activity: ActivityHandle,
    started: AtomicBool,
    wrap_up_sent: AtomicBool,
    pause_requested: AtomicBool,
    timed_out: AtomicBool,
    done: Notify,
    done_flag: AtomicBool,
}

impl SessionInner {
    fn kill_child(&self) {
        let mut child = self.child.lock();
        if let Some(child) = child.as_mut() {
            if let Err(e) = child.start_kill() {
                tracing::warn!(error = %e, "failed to kill session child");
            }
        }
    }

    fn finish(&self) {
        self.done_flag.store(true, Ordering::SeqCst);
        self.done.notify_waiters();
    }
}

/// Supervisor for one session-binary process. Cheap to clone; clones share
/// the underlying process.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    pub fn new(spec: SessionSpec, router: EventRouter, runner: Arc<dyn ProcessRunner>) -> Self {
        let stderr_cap = spec.stderr_cap;
        Self {
            inner: Arc::new(SessionInner {
                spec,
                router,
                runner,
                child: Mutex::new(None),
                stdin: Mutex::new(None),
                stderr: LimitedWriter::new(stderr_cap),
                activity: ActivityHandle::new(),
                started: AtomicBool::new(false),
                wrap_up_sent: AtomicBool::new(false),
                pause_requested: AtomicBool::new(false),
                timed_out: AtomicBool::new(false),
                done: Notify::new(),
                done_flag: AtomicBool::new(false),
            }),
        }
    }

    /// Launch the session binary, write the prompt to its input stream
    /// (leaving the pipe open), and return its output stream for the
    /// parser. Fails with [`SessionError::AlreadyStarted`] on reinvocation.
    pub async fn start(&self, prompt: &str) -> Result<PipeReader, SessionError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadyStarted);
        }

        let command = self.inner.spec.command();
        tracing::debug!(command = %command.display(), "starting session");
        let mut child = self.inner.runner.spawn(command)?;

        let mut stdin = child.take_stdin().ok_or(SessionError::NoStdin)?;
        let stdout = child.take_stdout().ok_or(SessionError::NoStdin)?;
        let stderr = child.take_stderr();
        *self.inner.child.lock() = Some(child);

        stdin
            .write_all(prompt.as_bytes())
            .await
            .map_err(SessionError::Stdin)?;
        if !prompt.ends_with('\n') {
            stdin.write_all(b"\n").await.map_err(SessionError::Stdin)?;
        }
        stdin.flush().await.map_err(SessionError::Stdin)?;
        *self.inner.stdin.lock() = Some(stdin);

        if let Some(stderr) = stderr {
            tokio::spawn(capture_stderr(stderr, self.inner.stderr.clone()));
        }

        self.inner.activity.note();
        tokio::spawn(run_watchdog(Arc::clone(&self.inner)));

        Ok(stdout)
    }

    /// Watchdog heartbeat, called by the parser on each decoded frame.
    pub fn note_activity(&self) {
        self.inner.activity.note();
    }

    pub fn activity_handle(&self) -> ActivityHandle {
        self.inner.activity.clone()
    }

    /// Block until the child exits. Also releases the watchdog.
    pub async fn wait(&self) -> Result<ExitInfo, SessionError> {
        if !self.inner.started.load(Ordering::SeqCst) {
            return Err(SessionError::NotStarted);
        }
        loop {
            let status = {
                let mut child = self.inner.child.lock();
                match child.as_mut() {
                    Some(child) => child.try_wait().map_err(SessionError::Spawn)?,
                    None => return Err(SessionError::NotStarted),
                }
            };
            if let Some(exit) = status {
                self.inner.finish();
                return Ok(exit);
            }
            tokio::time::sleep(crate::env::child_poll()).await;
        }
    }

    /// Force-kill. Safe to call multiple times and from any task.
    pub fn stop(&self) {
        self.inner.kill_child();
        self.inner.finish();
    }

    /// One-way flag checked by the controller at iteration boundaries;
    /// does not itself touch the process.
    pub fn request_pause(&self) {
        self.inner.pause_requested.store(true, Ordering::SeqCst);
    }

    pub fn pause_requested(&self) -> bool {
        self.inner.pause_requested.load(Ordering::SeqCst)
    }

    /// Append the wrap-up prompt to the child's input stream and close it,
    /// letting the session finish its current turn.
    pub async fn send_wrap_up(&self, prompt: &str) -> Result<(), SessionError> {
        if self.inner.wrap_up_sent.swap(true, Ordering::SeqCst) {
            return Err(SessionError::WrapUpAlreadySent);
        }
        let stdin = self.inner.stdin.lock().take();
        let Some(mut stdin) = stdin else {
            return Err(SessionError::NoStdin);
        };
        stdin
            .write_all(prompt.as_bytes())
            .await
            .map_err(SessionError::Stdin)?;
        if !prompt.ends_with('\n') {
            stdin.write_all(b"\n").await.map_err(SessionError::Stdin)?;
        }
        stdin.shutdown().await.map_err(SessionError::Stdin)?;
        Ok(())
    }

    /// Close the input stream without a wrap-up prompt (normal completion).
    pub async fn close_stdin(&self) -> Result<(), SessionError> {
        let stdin = self.inner.stdin.lock().take();
        if let Some(mut stdin) = stdin {
            stdin.shutdown().await.map_err(SessionError::Stdin)?;
        }
        Ok(())
    }

    /// Whether the watchdog terminated this session.
    pub fn timed_out(&self) -> bool {
        self.inner.timed_out.load(Ordering::SeqCst)
    }

    /// Captured diagnostic-stream bytes.
    pub fn stderr_bytes(&self) -> Vec<u8> {
        self.inner.stderr.bytes()
    }

    pub fn stderr_string(&self) -> String {
        self.inner.stderr.to_string_lossy()
    }
}

/// Drain a child's stderr into the bounded capture.
async fn capture_stderr(mut stderr: PipeReader, writer: LimitedWriter) {
    use std::io::Write;
    let mut writer = writer;
    let mut buf = [0u8; 4096];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                // LimitedWriter::write never fails.
                let _ = writer.write_all(&buf[..n]);
            }
        }
    }
}

/// Periodic silence check. Ticks immediately at start, then every
/// `ATARI_WATCHDOG_TICK_MS` (default 10s); exits when the session is done.
async fn run_watchdog(inner: Arc<SessionInner>) {
    let mut ticker = tokio::time::interval(crate::env::watchdog_tick());
    let timeout_ms = inner.spec.timeout.as_millis() as u64;
    loop {
        if inner.done_flag.load(Ordering::SeqCst) {
            return;
        }
        tokio::select! {
            _ = ticker.tick() => {
                let elapsed = SystemClock.epoch_ms().saturating_sub(inner.activity.last_ms());
                if elapsed > timeout_ms {
                    inner.timed_out.store(true, Ordering::SeqCst);
                    tracing::warn!(elapsed_ms = elapsed, "session silent past timeout, killing");
                    if let Err(e) = inner
                        .router
                        .emit(Event::session(EventKind::SessionTimeout { elapsed_ms: elapsed }))
                    {
                        tracing::debug!(error = %e, "router closed during timeout emit");
                    }
                    inner.kill_child();
                    return;
                }
            }
            _ = inner.done.notified() => return,
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
