// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detach by re-execution.
//!
//! Forking an already-threaded process is off the table; instead the
//! parent re-executes itself with the same argument vector and a sentinel
//! environment variable, detaches the child's stdio and process group,
//! and exits once the child's socket accepts connections.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Sentinel set by the parent, checked by the child.
pub const DAEMONIZED_ENV: &str = "ATARI_DAEMONIZED";

/// How long the parent waits for the child's socket.
pub const SOCKET_WAIT: Duration = Duration::from_secs(2);

/// Poll step while waiting for the socket.
pub const SOCKET_POLL: Duration = Duration::from_millis(50);

/// Whether this process is the re-executed supervisor child.
pub fn is_daemon_child() -> bool {
    std::env::var(DAEMONIZED_ENV).map(|v| v == "1").unwrap_or(false)
}

/// Probe whether a Unix socket is accepting connections.
pub fn probe_socket(socket_path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Re-execute this binary with the same argument vector, sentinel set,
/// stdio disconnected and a fresh process group.
pub fn respawn_detached() -> std::io::Result<Child> {
    use std::os::unix::process::CommandExt;

    let exe = std::env::current_exe()?;
    Command::new(exe)
        .args(std::env::args().skip(1))
        .env(DAEMONIZED_ENV, "1")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()
}

/// Poll until the socket accepts, the child dies, or the budget runs out.
pub async fn wait_for_socket(socket_path: &Path, child: &mut Child) -> SocketWait {
    let start = Instant::now();
    while start.elapsed() < SOCKET_WAIT {
        if probe_socket(socket_path) {
            return SocketWait::Ready;
        }
        if let Ok(Some(status)) = child.try_wait() {
            return SocketWait::ChildExited(status.code());
        }
        tokio::time::sleep(SOCKET_POLL).await;
    }
    SocketWait::TimedOut
}

/// Outcome of waiting for the detached child's socket.
#[derive(Debug, PartialEq, Eq)]
pub enum SocketWait {
    Ready,
    ChildExited(Option<i32>),
    TimedOut,
}

#[cfg(test)]
#[path = "detach_tests.rs"]
mod tests;
