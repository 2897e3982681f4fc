// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor assembly: wires the lock, router, sinks, watcher,
//! controller and listener together and runs until stopped.

use crate::lifecycle::{self, DaemonMeta, LifecycleError, StateSnapshot};
use crate::listener::{ListenCtx, Listener};
use crate::paths::StatePaths;
use crate::events_log;
use atari_adapters::beads::watcher::{BeadsWatcher, WatcherConfig, WatchError};
use atari_adapters::{BeadsCli, ProcessRunner, SystemRunner};
use atari_core::{Clock, Config, EventRouter, RouterError, SystemClock};
use atari_engine::{Controller, StatusMirror};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{info, warn};

/// Bound on draining the controller after a stop request.
const GRACEFUL_SHUTDOWN: Duration = Duration::from_secs(60);

/// Supervisor errors
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("ticket watcher failed: {0}")]
    Watch(#[from] WatchError),

    #[error("event router failed: {0}")]
    Router(#[from] RouterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the supervisor for a project until stopped by signal or RPC.
///
/// With `log_to_file` set, tracing output goes to `daemon.log` inside the
/// state directory (the daemonized path); without, whatever subscriber
/// the caller installed stays in effect.
pub async fn run(
    project_root: &Path,
    config: Config,
    log_to_file: bool,
) -> Result<(), SupervisorError> {
    let paths = StatePaths::resolve(project_root, &config);
    std::fs::create_dir_all(&paths.state_dir)?;

    lifecycle::cleanup_stale(&paths);
    let lock = lifecycle::acquire_lock(&paths.lock_path)?;

    let _log_guard = if log_to_file {
        Some(setup_logging(&paths)?)
    } else {
        None
    };
    info!(project = %paths.project_root.display(), "starting supervisor");

    let socket = lifecycle::bind_socket(&paths.socket_path)?;

    let router = EventRouter::new(config.daemon.router_capacity);
    let events_sink = events_log::spawn_sink(&router, paths.events_log_path.clone())?;

    let watcher = BeadsWatcher::start(
        WatcherConfig::new(paths.bead_file.clone()),
        router.clone(),
    )?;

    let runner: Arc<dyn ProcessRunner> = Arc::new(SystemRunner::new());
    let beads = BeadsCli::new(
        Arc::clone(&runner),
        config.beads.binary.clone(),
        paths.project_root.clone(),
    );
    let mirror = StatusMirror::spawn(&router)?;

    let restored = lifecycle::load_state_snapshot(&paths.state_json_path).map(|s| s.queue);
    let controller = Controller::new(
        config.clone(),
        router.clone(),
        beads,
        runner,
        mirror,
        restored,
    );

    DaemonMeta {
        socket_path: paths.socket_path.clone(),
        lock_path: paths.lock_path.clone(),
        log_path: paths.log_path.clone(),
        start_time_ms: SystemClock.epoch_ms(),
        pid: std::process::id(),
    }
    .write(&paths.meta_path)?;

    let shutdown = Arc::new(Notify::new());
    let ctx = Arc::new(ListenCtx {
        controller: Some(controller.clone()),
        shutdown: Arc::clone(&shutdown),
        read_timeout: config.daemon.read_timeout(),
    });
    tokio::spawn(Listener::new(socket, ctx).run());

    let loop_controller = controller.clone();
    let mut controller_task = tokio::spawn(async move { loop_controller.run().await });

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(socket = %paths.socket_path.display(), "supervisor ready");
    println!("READY");

    tokio::select! {
        _ = shutdown.notified() => {
            info!("shutdown requested via command");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
            controller.request_stop(false);
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
            controller.request_stop(false);
        }
        _ = &mut controller_task => {
            info!("controller loop ended");
        }
    }

    if !controller_task.is_finished() {
        controller.request_stop(false);
        if tokio::time::timeout(GRACEFUL_SHUTDOWN, &mut controller_task)
            .await
            .is_err()
        {
            warn!("controller did not stop in time, aborting");
            controller_task.abort();
        }
    }

    lifecycle::save_state_snapshot(
        &paths.state_json_path,
        &StateSnapshot {
            stats: controller.status().stats,
            queue: controller.queue_snapshot(),
        },
    );

    watcher.stop().await;
    router.close();
    let _ = tokio::time::timeout(Duration::from_secs(1), events_sink).await;

    let _ = std::fs::remove_file(&paths.socket_path);
    let _ = std::fs::remove_file(&paths.meta_path);
    lock.release();
    info!("supervisor stopped");
    Ok(())
}

/// File logging for the daemonized supervisor: size-rotated `daemon.log`
/// with a non-blocking appender.
fn setup_logging(
    paths: &StatePaths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, SupervisorError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    events_log::rotate_if_needed(&paths.log_path);

    let file_appender = tracing_appender::rolling::never(
        &paths.state_dir,
        paths
            .log_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("daemon.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // try_init: a subscriber may already be installed (tests, foreground).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init();

    Ok(guard)
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
