// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    idle      = { ControllerState::Idle, "idle", false },
    iterating = { ControllerState::Iterating, "iterating", false },
    paused    = { ControllerState::Paused, "paused", false },
    stopping  = { ControllerState::Stopping, "stopping", true },
    stopped   = { ControllerState::Stopped, "stopped", true },
)]
fn state_names(state: ControllerState, name: &str, terminal: bool) {
    assert_eq!(state.to_string(), name);
    assert_eq!(state.is_terminal(), terminal);
}

#[test]
fn state_serializes_snake_case() {
    let json = serde_json::to_string(&ControllerState::Iterating).unwrap();
    assert_eq!(json, r#""iterating""#);
}

#[test]
fn stats_roundtrip() {
    let stats = QueueStats {
        iteration: 3,
        current_bead: Some("b-1".into()),
        current_turns: 2,
        total_seen: 5,
        completed: 1,
        failed: 1,
        abandoned: 0,
        in_backoff: 2,
    };
    let json = serde_json::to_string(&stats).unwrap();
    let back: QueueStats = serde_json::from_str(&json).unwrap();
    assert_eq!(back, stats);
}

#[test]
fn stats_omit_absent_current_bead() {
    let json = serde_json::to_string(&QueueStats::default()).unwrap();
    assert!(!json.contains("current_bead"));
}
