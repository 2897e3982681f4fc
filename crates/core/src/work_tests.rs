// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn policy() -> BackoffPolicy {
    BackoffPolicy {
        initial: Duration::from_secs(60),
        multiplier: 2.0,
        max: Duration::from_secs(3600),
        max_failures: 5,
    }
}

#[yare::parameterized(
    first   = { 1, 60 },
    second  = { 2, 120 },
    third   = { 3, 240 },
    fourth  = { 4, 480 },
    fifth   = { 5, 960 },
)]
fn delay_doubles(failures: u32, expected_secs: u64) {
    assert_eq!(
        backoff_delay(&policy(), failures),
        Duration::from_secs(expected_secs)
    );
}

#[test]
fn delay_is_capped_at_max() {
    // 60s * 2^19 is far past the one hour cap.
    assert_eq!(backoff_delay(&policy(), 20), Duration::from_secs(3600));
}

#[test]
fn zero_failures_means_no_delay() {
    assert_eq!(backoff_delay(&policy(), 0), Duration::ZERO);
}

#[test]
fn note_attempt_increments_and_stamps() {
    let mut item = WorkItem::new("b-1", "title", 2);
    assert_eq!(item.attempts, 0);
    item.note_attempt(1_000);
    item.note_attempt(2_000);
    assert_eq!(item.attempts, 2);
    assert_eq!(item.last_attempt_at_ms, Some(2_000));
}

#[test]
fn backoff_window_hides_item() {
    let mut item = WorkItem::new("b-1", "title", 2);
    item.next_eligible_at_ms = 5_000;
    assert!(item.in_backoff(4_999));
    assert!(!item.in_backoff(5_000));
}

#[test]
fn terminal_items_are_never_in_backoff() {
    let mut item = WorkItem::new("b-1", "title", 2);
    item.next_eligible_at_ms = u64::MAX;
    item.terminal = Terminal::Abandoned;
    assert!(!item.in_backoff(0));
    assert!(!item.is_active());
}
