// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate limiter for recurring warnings.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Allows at most one warning per interval.
///
/// Used by the stream parser and the ticket watcher so a flood of
/// malformed input produces one diagnostic per five seconds rather than
/// one per line.
pub struct WarnLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl WarnLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Default five second floor between warnings.
    pub fn default_floor() -> Self {
        Self::new(Duration::from_secs(5))
    }

    /// Returns true if a warning may be emitted now, and records it.
    pub fn allow(&self) -> bool {
        let mut last = self.last.lock();
        let now = Instant::now();
        match *last {
            Some(prev) if now.duration_since(prev) < self.min_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
#[path = "limit_tests.rs"]
mod tests;
