// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_epoch_is_nonzero() {
    assert!(SystemClock.epoch_ms() > 0);
}

#[test]
fn system_clock_epoch_is_monotonic_enough() {
    let a = SystemClock.epoch_ms();
    let b = SystemClock.epoch_ms();
    assert!(b >= a);
}
