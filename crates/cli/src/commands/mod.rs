// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI subcommand implementations.

pub mod control;
pub mod start;
pub mod status;

use crate::client::{timeout_ipc, RpcClient};
use crate::exit_error::CliError;
use anyhow::Context;
use atari_core::Config;
use atari_daemon::paths::{find_project_root, StatePaths};
use atari_daemon::DaemonMeta;
use std::path::PathBuf;

/// Resolved project context shared by all subcommands.
pub struct ProjectContext {
    pub root: PathBuf,
    pub config: Config,
    pub paths: StatePaths,
}

/// Locate the project (walking upward for a marker; the current directory
/// is the fallback for fresh projects), then load configuration.
pub fn load_context() -> Result<ProjectContext, CliError> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let root = find_project_root(&cwd).unwrap_or(cwd);
    let config = Config::load(&root)?;
    let paths = StatePaths::resolve(&root, &config);
    Ok(ProjectContext {
        root,
        config,
        paths,
    })
}

/// Client pointed at the running supervisor. The metadata file is
/// authoritative for the socket path when present.
pub fn client_for(ctx: &ProjectContext) -> RpcClient {
    let socket_path = DaemonMeta::read(&ctx.paths.meta_path)
        .map(|meta| meta.socket_path)
        .unwrap_or_else(|_| ctx.paths.socket_path.clone());
    RpcClient::new(socket_path, timeout_ipc())
}
