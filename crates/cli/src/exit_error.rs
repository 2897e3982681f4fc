// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI error type carrying the process exit code.
//!
//! Exit codes: 0 success, 1 daemon not running, 2 protocol error,
//! 3 daemon error.

use crate::client::ClientError;
use atari_core::ConfigError;
use atari_daemon::supervisor::SupervisorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("failed to start supervisor: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Client(e) => e.exit_code(),
            Self::Supervisor(_) | Self::Config(_) | Self::Other(_) => 2,
        }
    }
}
