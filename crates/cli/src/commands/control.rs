// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `atari pause | resume | stop | retry`

use super::{client_for, ProjectContext};
use crate::exit_error::CliError;

pub async fn pause(ctx: ProjectContext) -> Result<(), CliError> {
    let message = client_for(&ctx).pause().await?;
    println!("{message}");
    Ok(())
}

pub async fn resume(ctx: ProjectContext) -> Result<(), CliError> {
    let message = client_for(&ctx).resume().await?;
    println!("{message}");
    Ok(())
}

pub async fn stop(ctx: ProjectContext, force: bool) -> Result<(), CliError> {
    let message = client_for(&ctx).stop(force).await?;
    println!("{message}");
    Ok(())
}

pub async fn retry(ctx: ProjectContext, bead_id: Option<String>) -> Result<(), CliError> {
    let message = client_for(&ctx).retry(bead_id).await?;
    println!("{message}");
    Ok(())
}
