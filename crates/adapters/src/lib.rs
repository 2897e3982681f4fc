// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! atari-adapters: process, session and ticket-file adapters for the
//! atari supervisor.

pub mod beads;
pub mod env;
pub mod limit;
pub mod runner;
pub mod session;

pub use beads::{BeadsCli, BeadsCliError, ReadyBead};
pub use beads::watcher::{BeadsWatcher, WatcherConfig, WatcherHandle};
pub use limit::WarnLimiter;
pub use runner::{
    ChildHandle, CommandOutput, CommandSpec, ExitInfo, PipeReader, PipeWriter, ProcessRunner,
    RunnerError, SystemRunner,
};
pub use session::limited::LimitedWriter;
pub use session::parser::{SessionResult, StreamParser};
pub use session::{ActivityHandle, SessionError, SessionManager, SessionSpec};

#[cfg(any(test, feature = "test-support"))]
pub use runner::fake::{FakeChild, FakeChildControl, FakeRunner};
