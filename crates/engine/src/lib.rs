// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! atari-engine: work queue and controller for the atari supervisor.

pub mod controller;
pub mod mirror;
pub mod queue;

pub use controller::{Controller, StatusSnapshot};
pub use mirror::StatusMirror;
pub use queue::{FailureOutcome, QueueFilter, QueueSnapshot, WorkQueue};
