// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `atari start [--detach]`

use super::ProjectContext;
use crate::detach::{self, SocketWait};
use crate::exit_error::CliError;
use anyhow::anyhow;
use atari_daemon::supervisor;

pub async fn run(ctx: ProjectContext, detach_requested: bool) -> Result<(), CliError> {
    if detach_requested && !detach::is_daemon_child() {
        return respawn(ctx).await;
    }

    let daemonized = detach::is_daemon_child();
    if !daemonized {
        init_console_logging();
    }
    supervisor::run(&ctx.root, ctx.config, daemonized).await?;
    Ok(())
}

/// Parent side of the detach: re-exec with the sentinel, wait for the
/// child's socket, report.
async fn respawn(ctx: ProjectContext) -> Result<(), CliError> {
    let mut child = detach::respawn_detached()
        .map_err(|e| anyhow!("failed to re-execute for detach: {e}"))?;

    match detach::wait_for_socket(&ctx.paths.socket_path, &mut child).await {
        SocketWait::Ready => {
            println!("supervisor started (pid {})", child.id());
            Ok(())
        }
        SocketWait::ChildExited(code) => Err(anyhow!(
            "supervisor exited during startup (code {code:?}); see {}",
            ctx.paths.log_path.display()
        )
        .into()),
        SocketWait::TimedOut => Err(anyhow!(
            "supervisor socket did not come up at {}",
            ctx.paths.socket_path.display()
        )
        .into()),
    }
}

fn init_console_logging() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
