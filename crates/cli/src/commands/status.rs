// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `atari status [--json]`

use super::{client_for, ProjectContext};
use crate::exit_error::CliError;
use anyhow::Context;
use atari_core::format_elapsed;
use atari_daemon::StatusResult;

pub async fn run(ctx: ProjectContext, json: bool) -> Result<(), CliError> {
    let status = client_for(&ctx).status().await?;
    if json {
        let raw = serde_json::to_string_pretty(&status).context("serializing status")?;
        println!("{raw}");
    } else {
        print!("{}", render(&status));
    }
    Ok(())
}

fn render(status: &StatusResult) -> String {
    let mut out = format!("atari: {}\n", status.status);
    if let Some(bead) = &status.current_bead {
        out.push_str(&format!(
            "  bead: {} ({} turns)\n",
            bead, status.stats.current_turns
        ));
    }
    out.push_str(&format!(
        "  uptime: {}\n",
        format_elapsed(status.uptime_secs)
    ));
    out.push_str(&format!(
        "  iterations: {}  completed: {}  failed: {}  abandoned: {}\n",
        status.stats.iteration,
        status.stats.completed,
        status.stats.failed,
        status.stats.abandoned
    ));
    out.push_str(&format!(
        "  seen: {}  in backoff: {}\n",
        status.stats.total_seen, status.stats.in_backoff
    ));
    out
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
