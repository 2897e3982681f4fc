// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket-state watcher: a reactive mirror of the bead JSONL file.
//!
//! Watches the parent directory (so later creation of the file is also
//! observed), debounces bursts of writes, re-parses the whole file and
//! publishes diffs as `ticket-changed` events. Deletion of the file does
//! not arm the debounce, so a delete-and-identical-recreate coalesces to
//! zero events.

use atari_core::bead::{diff_indexes, load_index, BeadIndex};
use atari_core::{Event, EventKind, EventRouter, RouterError, Severity};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::limit::WarnLimiter;

/// Watcher errors
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("bead file has no parent directory: {0}")]
    NoParent(PathBuf),

    #[error("failed to prepare watch directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to register directory watch: {0}")]
    Notify(#[from] notify::Error),
}

/// Configuration for the ticket-state watcher.
pub struct WatcherConfig {
    pub bead_file: PathBuf,
    pub debounce: Duration,
}

impl WatcherConfig {
    pub fn new(bead_file: PathBuf) -> Self {
        Self {
            bead_file,
            debounce: crate::env::watch_debounce(),
        }
    }
}

/// Handle on a running watcher task.
pub struct WatcherHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop the watcher and wait for its task to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

/// Directory-watching diff engine for the bead file.
pub struct BeadsWatcher;

impl BeadsWatcher {
    /// Register the directory watch and spawn the watcher task.
    pub fn start(config: WatcherConfig, router: EventRouter) -> Result<WatcherHandle, WatchError> {
        let parent = config
            .bead_file
            .parent()
            .ok_or_else(|| WatchError::NoParent(config.bead_file.clone()))?
            .to_path_buf();

        if !parent.exists() {
            std::fs::create_dir_all(&parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&parent, std::fs::Permissions::from_mode(0o755))?;
            }
        }

        // Recorded before the watch starts: a pre-existing file seeds the
        // baseline silently, a file that appears later emits creations.
        let startup_existed = config.bead_file.exists();

        let (events_tx, events_rx) = mpsc::channel(64);
        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                let _ = events_tx.blocking_send(res);
            })?;
        watcher.watch(&parent, RecursiveMode::NonRecursive)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_watcher(RunParams {
            bead_file: config.bead_file,
            debounce: config.debounce,
            startup_existed,
            router,
            events_rx,
            shutdown_rx,
            _watcher: watcher,
        }));

        Ok(WatcherHandle {
            shutdown: Some(shutdown_tx),
            task,
        })
    }
}

struct RunParams {
    bead_file: PathBuf,
    debounce: Duration,
    startup_existed: bool,
    router: EventRouter,
    events_rx: mpsc::Receiver<Result<notify::Event, notify::Error>>,
    shutdown_rx: oneshot::Receiver<()>,
    // Held so the OS watch stays registered for the task's lifetime.
    _watcher: RecommendedWatcher,
}

async fn run_watcher(params: RunParams) {
    let RunParams {
        bead_file,
        debounce,
        startup_existed,
        router,
        mut events_rx,
        mut shutdown_rx,
        _watcher,
    } = params;

    let limiter = WarnLimiter::default_floor();
    let mut index = BeadIndex::new();

    // Initial load. A pre-existing file is a silent baseline; a file that
    // appeared since construction diffs against the empty index, which
    // yields creation-shaped events.
    if bead_file.exists() {
        match load_index(&bead_file) {
            Ok(loaded) => {
                if startup_existed {
                    tracing::debug!(beads = loaded.len(), "seeded bead index silently");
                } else if emit_diff(&router, &index, &loaded).is_err() {
                    return;
                }
                index = loaded;
            }
            Err(e) => warn_watch(&router, &limiter, &format!("initial bead load failed: {e}")),
        }
    } else {
        tracing::debug!(file = %bead_file.display(), "bead file absent at startup");
    }

    let file_name = bead_file.file_name().map(|n| n.to_os_string());
    let mut deadline: Option<tokio::time::Instant> = None;

    loop {
        tokio::select! {
            maybe = events_rx.recv() => match maybe {
                None => break,
                Some(Ok(event)) => {
                    if is_relevant(&event, file_name.as_deref()) {
                        deadline = Some(tokio::time::Instant::now() + debounce);
                    }
                }
                Some(Err(e)) => {
                    warn_watch(&router, &limiter, &format!("directory watch error: {e}"));
                }
            },

            _ = async {
                match deadline {
                    Some(d) => tokio::time::sleep_until(d).await,
                    None => std::future::pending().await,
                }
            } => {
                deadline = None;
                if reload(&bead_file, &mut index, &router, &limiter).is_err() {
                    break;
                }
            }

            _ = &mut shutdown_rx => break,
        }
    }
    tracing::debug!("bead watcher stopped");
}

/// Does this notification concern the bead file with a write/create op?
fn is_relevant(event: &notify::Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    if !(event.kind.is_create() || event.kind.is_modify()) {
        return false;
    }
    let Some(name) = file_name else {
        return false;
    };
    event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(name))
}

/// Full re-parse and diff. Returns Err only when the router has closed.
fn reload(
    bead_file: &Path,
    index: &mut BeadIndex,
    router: &EventRouter,
    limiter: &WarnLimiter,
) -> Result<(), RouterError> {
    if !bead_file.exists() {
        tracing::debug!(file = %bead_file.display(), "bead file missing at reload, keeping index");
        return Ok(());
    }
    let loaded = match load_index(bead_file) {
        Ok(loaded) => loaded,
        Err(e) => {
            warn_watch(router, limiter, &format!("bead reload failed: {e}"));
            return Ok(());
        }
    };
    emit_diff(router, index, &loaded)?;
    *index = loaded;
    Ok(())
}

fn emit_diff(router: &EventRouter, old: &BeadIndex, new: &BeadIndex) -> Result<(), RouterError> {
    for change in diff_indexes(old, new) {
        router.emit(Event::ticket(EventKind::TicketChanged {
            before: change.before,
            after: change.after,
        }))?;
    }
    Ok(())
}

fn warn_watch(router: &EventRouter, limiter: &WarnLimiter, message: &str) {
    tracing::warn!(message);
    if !limiter.allow() {
        return;
    }
    let _ = router.emit(Event::ticket(EventKind::Error {
        severity: Severity::Warning,
        message: message.to_string(),
        bead_id: None,
    }));
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
