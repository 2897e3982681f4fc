// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller: the supervisor's single cooperative drive loop.
//!
//! One pass = select a bead, claim it through the ticket CLI, run a
//! session over it, score the outcome, update backoff and statistics.
//! Pause/resume/stop arrive as flags from other tasks and are observed at
//! iteration boundaries; a force stop kills the in-flight session.

use crate::mirror::StatusMirror;
use crate::queue::{FailureOutcome, QueueFilter, QueueSnapshot, WorkQueue};
use atari_adapters::{
    BeadsCli, ProcessRunner, ReadyBead, SessionManager, SessionSpec, SessionResult, StreamParser,
};
use atari_core::template::{expand, PromptVars};
use atari_core::{
    Clock, Config, ControllerState, Event, EventKind, EventRouter, EventSource, QueueStats,
    Severity, Subscription, SystemClock,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Point-in-time view served by the `status` RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: ControllerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_bead: Option<String>,
    pub uptime_ms: u64,
    pub start_time_ms: u64,
    pub stats: QueueStats,
}

struct CtrlInner {
    config: Config,
    router: EventRouter,
    beads: BeadsCli,
    runner: Arc<dyn ProcessRunner>,
    mirror: StatusMirror,
    queue: Mutex<WorkQueue>,
    stats: Mutex<QueueStats>,
    state: Mutex<ControllerState>,
    start_instant: Instant,
    start_epoch_ms: u64,
    pause_requested: AtomicBool,
    stop_requested: AtomicBool,
    force_stop: AtomicBool,
    wake: Notify,
    current_session: Mutex<Option<SessionManager>>,
    /// State to restore when a pause is lifted.
    resume_to: Mutex<ControllerState>,
}

impl CtrlInner {
    fn emit(&self, event: Event) {
        if let Err(e) = self.router.emit(event) {
            tracing::debug!(error = %e, "router closed, event dropped");
        }
    }

    fn warn_event(&self, message: String, bead_id: Option<String>) {
        tracing::warn!(%message);
        self.emit(Event::internal(EventKind::Error {
            severity: Severity::Warning,
            message,
            bead_id,
        }));
    }

    fn set_state(&self, to: ControllerState) {
        let from = {
            let mut state = self.state.lock();
            if *state == to {
                return;
            }
            let from = *state;
            *state = to;
            from
        };
        tracing::info!(%from, %to, "controller state change");
        self.emit(Event::internal(EventKind::StateChanged { from, to }));
    }
}

/// Outcome material of one session run.
struct SessionCycle {
    spawn_failed: bool,
    timed_out: bool,
    exit_success: bool,
    result: Option<SessionResult>,
}

/// The supervisor's drive loop and its externally callable controls.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<CtrlInner>,
}

impl Controller {
    pub fn new(
        config: Config,
        router: EventRouter,
        beads: BeadsCli,
        runner: Arc<dyn ProcessRunner>,
        mirror: StatusMirror,
        restored: Option<QueueSnapshot>,
    ) -> Self {
        let mut queue = WorkQueue::new(
            config.backoff.policy(),
            QueueFilter::from_config(&config.workqueue),
        );
        if let Some(snapshot) = restored {
            queue.restore(snapshot);
        }
        Self {
            inner: Arc::new(CtrlInner {
                router,
                beads,
                runner,
                mirror,
                queue: Mutex::new(queue),
                stats: Mutex::new(QueueStats::default()),
                state: Mutex::new(ControllerState::Idle),
                start_instant: Instant::now(),
                start_epoch_ms: SystemClock.epoch_ms(),
                pause_requested: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
                force_stop: AtomicBool::new(false),
                wake: Notify::new(),
                current_session: Mutex::new(None),
                resume_to: Mutex::new(ControllerState::Idle),
                config,
            }),
        }
    }

    // -- external controls (safe from any task) --

    pub fn state(&self) -> ControllerState {
        *self.inner.state.lock()
    }

    pub fn status(&self) -> StatusSnapshot {
        let stats = self.inner.stats.lock().clone();
        StatusSnapshot {
            state: *self.inner.state.lock(),
            current_bead: stats.current_bead.clone(),
            uptime_ms: self.inner.start_instant.elapsed().as_millis() as u64,
            start_time_ms: self.inner.start_epoch_ms,
            stats,
        }
    }

    /// Pause the supervisor. The state flips to `paused` immediately so a
    /// follow-up `status` reflects the request; iteration work itself
    /// still winds down only at the next boundary.
    pub fn request_pause(&self) {
        let current = *self.inner.state.lock();
        if !current.is_terminal() {
            if current != ControllerState::Paused {
                *self.inner.resume_to.lock() = current;
            }
            self.inner.set_state(ControllerState::Paused);
        }
        self.inner.pause_requested.store(true, Ordering::SeqCst);
        self.inner.wake.notify_waiters();
    }

    /// Leave the paused state, restoring the state the pause interrupted.
    pub fn request_resume(&self) {
        self.inner.pause_requested.store(false, Ordering::SeqCst);
        if *self.inner.state.lock() == ControllerState::Paused {
            let restore = *self.inner.resume_to.lock();
            self.inner.set_state(restore);
        }
        self.inner.wake.notify_waiters();
    }

    /// Stop draining. The state flips to `stopping` immediately; a force
    /// stop kills the in-flight session, a graceful stop wraps it up
    /// first.
    pub fn request_stop(&self, force: bool) {
        if force {
            self.inner.force_stop.store(true, Ordering::SeqCst);
        }
        self.inner.stop_requested.store(true, Ordering::SeqCst);
        if !self.inner.state.lock().is_terminal() {
            self.inner.set_state(ControllerState::Stopping);
        }
        self.inner.wake.notify_waiters();
    }

    /// Clear backoff for one bead (reviving it if abandoned) or for every
    /// stalled bead. Returns how many beads were affected.
    pub fn clear_backoff(&self, bead_id: Option<&str>) -> usize {
        let now = SystemClock.epoch_ms();
        let cleared = self.inner.queue.lock().clear_backoff(bead_id, now);
        self.inner.wake.notify_waiters();
        cleared
    }

    /// Queue bookkeeping for the crash-recovery snapshot.
    pub fn queue_snapshot(&self) -> QueueSnapshot {
        self.inner.queue.lock().snapshot()
    }

    // -- drive loop --

    /// Run until stopped. Single-threaded: all iteration work happens
    /// here; the control methods above only flip flags and publish the
    /// requested state transition.
    pub async fn run(&self) {
        let inner = &self.inner;
        inner.emit(Event::internal(EventKind::DrainStart));

        loop {
            if inner.stop_requested.load(Ordering::SeqCst) {
                break;
            }
            if inner.pause_requested.load(Ordering::SeqCst) {
                self.enter_paused().await;
                continue;
            }

            let ready = match inner.beads.ready().await {
                Ok(ready) => ready,
                Err(e) => {
                    inner.warn_event(format!("ready poll failed: {e}"), None);
                    self.idle_wait().await;
                    continue;
                }
            };

            let now = SystemClock.epoch_ms();
            let pick = {
                let mut queue = inner.queue.lock();
                queue.observe(&ready);
                let pick = queue.select(&ready, now).cloned();
                let mut stats = inner.stats.lock();
                stats.total_seen = queue.total_seen();
                stats.in_backoff = queue.in_backoff(now);
                pick
            };

            match pick {
                Some(bead) => self.iterate(bead).await,
                None => self.idle_wait().await,
            }
        }

        self.inner.set_state(ControllerState::Stopping);
        let reason = if inner.force_stop.load(Ordering::SeqCst) {
            "force stop"
        } else {
            "stop requested"
        };
        inner.emit(Event::internal(EventKind::DrainStop {
            reason: reason.to_string(),
        }));
        self.inner.set_state(ControllerState::Stopped);
    }

    /// Sleep one poll interval, waking early for pause/resume/stop.
    async fn idle_wait(&self) {
        tokio::select! {
            _ = tokio::time::sleep(self.inner.config.workqueue.poll_interval()) => {}
            _ = self.inner.wake.notified() => {}
        }
    }

    async fn enter_paused(&self) {
        self.inner.set_state(ControllerState::Paused);
        while self.inner.pause_requested.load(Ordering::SeqCst)
            && !self.inner.stop_requested.load(Ordering::SeqCst)
        {
            tokio::select! {
                _ = self.inner.wake.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(250)) => {}
            }
        }
        if !self.inner.stop_requested.load(Ordering::SeqCst) {
            self.inner.set_state(ControllerState::Idle);
        }
    }

    /// One claim → session → score pass over a single bead.
    async fn iterate(&self, bead: ReadyBead) {
        let inner = &self.inner;
        let now = SystemClock.epoch_ms();
        let attempt = inner.queue.lock().note_attempt(&bead.id, now);
        {
            let mut stats = inner.stats.lock();
            stats.iteration += 1;
            stats.current_bead = Some(bead.id.clone());
            stats.current_turns = 0;
        }
        self.inner.set_state(ControllerState::Iterating);

        // Claim through the ticket CLI. A failed claim is a failed attempt.
        if let Err(e) = inner.beads.update_status(&bead.id, "in_progress").await {
            inner.warn_event(format!("claim failed: {e}"), Some(bead.id.clone()));
            self.conclude(&bead, false, 0, 0.0);
            return;
        }

        inner.emit(Event::internal(EventKind::IterationStart {
            bead_id: bead.id.clone(),
            attempt,
        }));

        let vars = self.prompt_vars(&bead);
        let work_prompt = expand(&inner.config.prompts.work, &vars);
        let wrap_up_prompt = expand(&inner.config.prompts.wrap_up, &vars);

        let spec = SessionSpec::from_settings(&inner.config.session);
        let primary = self
            .run_one_session(&bead, &work_prompt, &wrap_up_prompt, spec)
            .await;

        let mut turns = primary.result.as_ref().map(|r| r.turns).unwrap_or(0);
        let mut cost = primary.result.as_ref().map(|r| r.cost_usd).unwrap_or(0.0);

        // Outcome ordering: timeout beats everything, then the ticket
        // file's closed status, then the exit code, then follow-up.
        let success = if primary.spawn_failed || primary.timed_out {
            false
        } else if inner.mirror.is_closed(&bead.id) {
            true
        } else if !primary.exit_success {
            false
        } else if inner.config.follow_up.enabled {
            let follow_prompt = expand(&inner.config.prompts.follow_up, &vars);
            let follow_spec = SessionSpec::from_settings(&inner.config.session)
                .with_max_turns(inner.config.follow_up.max_turns);
            let follow = self
                .run_one_session(&bead, &follow_prompt, &wrap_up_prompt, follow_spec)
                .await;
            if let Some(result) = &follow.result {
                turns += result.turns;
                cost += result.cost_usd;
            }
            !follow.spawn_failed
                && !follow.timed_out
                && (inner.mirror.is_closed(&bead.id) || follow.exit_success)
        } else {
            true
        };

        if turns == 0 {
            turns = inner.stats.lock().current_turns;
        }

        // A verified bead the ticket file doesn't yet show closed gets
        // closed here so the queue converges.
        if success && !inner.mirror.is_closed(&bead.id) {
            if let Err(e) = inner.beads.close(&bead.id, "completed by supervisor").await {
                inner.warn_event(format!("close failed: {e}"), Some(bead.id.clone()));
            }
        }

        self.conclude(&bead, success, turns, cost);
    }

    /// Emit `iteration-end` and settle statistics and backoff. Exactly one
    /// of completed/failed/abandoned increments per call, so their sum
    /// tracks the iteration-end count.
    fn conclude(&self, bead: &ReadyBead, success: bool, turns: u32, cost: f64) {
        let inner = &self.inner;
        inner.emit(Event::internal(EventKind::IterationEnd {
            bead_id: bead.id.clone(),
            success,
            turns,
            cost_usd: cost,
        }));

        let now = SystemClock.epoch_ms();
        if success {
            inner.queue.lock().record_success(&bead.id);
            inner.stats.lock().completed += 1;
        } else {
            let outcome = inner.queue.lock().record_failure(&bead.id, now);
            match outcome {
                FailureOutcome::Backoff { attempts, .. } => {
                    tracing::info!(bead = %bead.id, attempts, "iteration failed, backing off");
                    inner.stats.lock().failed += 1;
                }
                FailureOutcome::Abandoned { attempts } => {
                    inner.stats.lock().abandoned += 1;
                    inner.emit(Event::internal(EventKind::BeadAbandoned {
                        bead_id: bead.id.clone(),
                        attempts,
                        max_failures: inner.config.backoff.max_failures,
                    }));
                }
            }
        }

        {
            let mut stats = inner.stats.lock();
            stats.current_bead = None;
            stats.current_turns = 0;
        }
        // A pending pause or stop already owns the state.
        if !inner.stop_requested.load(Ordering::SeqCst)
            && !inner.pause_requested.load(Ordering::SeqCst)
        {
            self.inner.set_state(ControllerState::Idle);
        }
    }

    /// Spawn one session, parse its stream to EOF, reap it.
    async fn run_one_session(
        &self,
        bead: &ReadyBead,
        prompt: &str,
        wrap_up_prompt: &str,
        spec: SessionSpec,
    ) -> SessionCycle {
        let inner = &self.inner;
        let session = SessionManager::new(spec, inner.router.clone(), Arc::clone(&inner.runner));
        *inner.current_session.lock() = Some(session.clone());

        let stdout = match session.start(prompt).await {
            Ok(stdout) => stdout,
            Err(e) => {
                inner.warn_event(format!("session spawn failed: {e}"), Some(bead.id.clone()));
                *inner.current_session.lock() = None;
                return SessionCycle {
                    spawn_failed: true,
                    timed_out: false,
                    exit_success: false,
                    result: None,
                };
            }
        };
        inner.emit(Event::session(EventKind::SessionStart {
            bead_id: bead.id.clone(),
        }));

        let monitor = match inner.router.subscribe() {
            Ok(sub) => Some(tokio::spawn(monitor_session(
                Arc::clone(inner),
                session.clone(),
                bead.id.clone(),
                bead.priority,
                wrap_up_prompt.to_string(),
                sub,
            ))),
            Err(_) => None,
        };

        let mut parser = StreamParser::new(inner.router.clone(), session.activity_handle());
        if let Err(e) = parser.run(stdout).await {
            tracing::warn!(error = %e, bead = %bead.id, "session stream aborted");
        }
        if let Err(e) = session.close_stdin().await {
            tracing::debug!(error = %e, "closing session stdin failed");
        }

        let exit = session.wait().await;
        if let Some(monitor) = monitor {
            monitor.abort();
        }
        *inner.current_session.lock() = None;

        let exit_success = match exit {
            Ok(exit) => exit.success,
            Err(e) => {
                tracing::warn!(error = %e, bead = %bead.id, "session wait failed");
                false
            }
        };
        if !exit_success && !session.timed_out() {
            let stderr = session.stderr_string();
            if !stderr.is_empty() {
                tracing::debug!(bead = %bead.id, stderr = %stderr, "session diagnostics");
            }
        }

        SessionCycle {
            spawn_failed: false,
            timed_out: session.timed_out(),
            exit_success,
            result: parser.take_result(),
        }
    }

    fn prompt_vars(&self, bead: &ReadyBead) -> PromptVars {
        PromptVars {
            bead_id: bead.id.clone(),
            bead_title: bead.title.clone(),
            bead_description: bead.description.clone(),
            label: self
                .inner
                .config
                .workqueue
                .label
                .clone()
                .unwrap_or_default(),
            bead_parent: bead.parent.clone().unwrap_or_default(),
        }
    }
}

/// Companion task for an in-flight session: counts turns, watches for
/// stop requests, and drives eager switching.
async fn monitor_session(
    inner: Arc<CtrlInner>,
    session: SessionManager,
    bead_id: String,
    bead_priority: i64,
    wrap_up_prompt: String,
    mut sub: Subscription,
) {
    let mut armed = false;
    let mut wrap_up_sent = false;
    let mut ticker = tokio::time::interval(inner.config.workqueue.poll_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        if inner.stop_requested.load(Ordering::SeqCst) {
            if inner.force_stop.load(Ordering::SeqCst) {
                session.stop();
                return;
            }
            if !wrap_up_sent {
                wrap_up_sent = true;
                if let Err(e) = session.send_wrap_up(&wrap_up_prompt).await {
                    tracing::debug!(error = %e, "wrap-up on stop failed");
                }
            }
        }

        tokio::select! {
            maybe = sub.recv() => match maybe {
                None => return,
                Some(event) => {
                    if event.source != EventSource::Session {
                        continue;
                    }
                    if matches!(event.kind, EventKind::SessionText { .. }) {
                        inner.stats.lock().current_turns += 1;
                    }
                    // Any session event marks a turn boundary.
                    if armed && !wrap_up_sent {
                        wrap_up_sent = true;
                        if let Err(e) = session.send_wrap_up(&wrap_up_prompt).await {
                            tracing::debug!(error = %e, "eager-switch wrap-up failed");
                        }
                    }
                }
            },

            _ = ticker.tick() => {
                if inner.config.workqueue.eager_switch && !armed && !wrap_up_sent {
                    match inner.beads.ready().await {
                        Ok(ready) => {
                            let now = SystemClock.epoch_ms();
                            let preempt = inner
                                .queue
                                .lock()
                                .preempts(&bead_id, bead_priority, &ready, now);
                            if preempt {
                                tracing::info!(bead = %bead_id, "higher-priority bead ready, pausing session");
                                session.request_pause();
                                armed = true;
                            }
                        }
                        Err(e) => tracing::debug!(error = %e, "eager-switch poll failed"),
                    }
                }
            }

            _ = inner.wake.notified() => {}
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
