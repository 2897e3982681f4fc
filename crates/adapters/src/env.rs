// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Watchdog check interval (default: 10000ms).
pub fn watchdog_tick() -> Duration {
    parse_duration_ms("ATARI_WATCHDOG_TICK_MS").unwrap_or(Duration::from_secs(10))
}

/// Debounce window between a ticket-file change and re-parse (default: 100ms).
pub fn watch_debounce() -> Duration {
    parse_duration_ms("ATARI_WATCH_DEBOUNCE_MS").unwrap_or(Duration::from_millis(100))
}

/// Child-exit poll interval for `SessionManager::wait` (default: 50ms).
pub fn child_poll() -> Duration {
    parse_duration_ms("ATARI_CHILD_POLL_MS").unwrap_or(Duration::from_millis(50))
}

/// Timeout for one-shot ticket CLI commands (default: 60s).
pub fn beads_command_timeout() -> Duration {
    parse_duration_ms("ATARI_BEADS_TIMEOUT_MS").unwrap_or(Duration::from_secs(60))
}
