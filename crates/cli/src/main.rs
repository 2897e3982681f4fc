// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! atari - bead queue supervisor CLI

mod client;
mod commands;
mod detach;
mod exit_error;

use clap::{Parser, Subcommand};
use exit_error::CliError;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "atari",
    version,
    about = "Drives a coding-assistant session through a queue of beads"
)]
struct Cli {
    /// Change to <dir> before doing anything
    #[arg(short = 'C', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the supervisor (foreground unless --detach)
    Start {
        /// Re-exec into the background and return once the socket is up
        #[arg(long)]
        detach: bool,
    },
    /// Stop the running supervisor
    Stop {
        /// Kill the in-flight session instead of wrapping it up
        #[arg(long)]
        force: bool,
    },
    /// Pause at the next iteration boundary
    Pause,
    /// Resume a paused supervisor
    Resume,
    /// Show supervisor state and statistics
    Status {
        /// Raw JSON output
        #[arg(long)]
        json: bool,
    },
    /// Clear backoff for one bead, or for every stalled bead
    Retry {
        /// Bead id (omit to retry all stalled beads)
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(dir) = &cli.directory {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("error: cannot change to {}: {e}", dir.display());
            return ExitCode::from(2);
        }
    }

    match dispatch(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn dispatch(command: Commands) -> Result<(), CliError> {
    let ctx = commands::load_context()?;
    match command {
        Commands::Start { detach } => commands::start::run(ctx, detach).await,
        Commands::Stop { force } => commands::control::stop(ctx, force).await,
        Commands::Pause => commands::control::pause(ctx).await,
        Commands::Resume => commands::control::resume(ctx).await,
        Commands::Status { json } => commands::status::run(ctx, json).await,
        Commands::Retry { id } => commands::control::retry(ctx, id).await,
    }
}
