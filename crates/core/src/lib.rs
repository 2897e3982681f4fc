// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! atari-core: Core library for the atari bead supervisor

pub mod bead;
pub mod bus;
pub mod clock;
pub mod compat;
pub mod config;
pub mod event;
pub mod state;
pub mod template;
pub mod time_fmt;
pub mod work;

pub use bead::{diff_indexes, load_index, BeadChange, BeadIndex, BeadSnapshot};
pub use bus::{EventRouter, RouterError, Subscription};
pub use clock::{Clock, SystemClock};
pub use config::{
    BackoffSettings, BeadsConfig, Config, ConfigError, DaemonSettings, FollowUpConfig,
    PromptsConfig, SessionSettings, WorkQueueConfig,
};
pub use event::{Event, EventKind, EventSource, Severity};
pub use state::{ControllerState, QueueStats};
pub use template::{expand, PromptVars};
pub use time_fmt::{format_elapsed, format_elapsed_ms};
pub use work::{backoff_delay, BackoffPolicy, Terminal, WorkItem};
