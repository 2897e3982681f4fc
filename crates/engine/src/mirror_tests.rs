// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atari_core::bead::BeadSnapshot;
use atari_core::Event;
use std::time::Duration;

fn bead(id: &str, status: &str) -> BeadSnapshot {
    BeadSnapshot {
        id: id.to_string(),
        title: "t".to_string(),
        status: status.to_string(),
        priority: 0,
        issue_type: "task".to_string(),
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

#[tokio::test]
async fn tracks_status_from_change_events() {
    let router = EventRouter::new(64);
    let mirror = StatusMirror::spawn(&router).unwrap();

    router
        .emit(Event::ticket(EventKind::TicketChanged {
            before: None,
            after: Some(bead("a", "open")),
        }))
        .unwrap();
    settle().await;
    assert_eq!(mirror.status("a").as_deref(), Some("open"));
    assert!(!mirror.is_closed("a"));

    router
        .emit(Event::ticket(EventKind::TicketChanged {
            before: Some(bead("a", "open")),
            after: Some(bead("a", "closed")),
        }))
        .unwrap();
    settle().await;
    assert!(mirror.is_closed("a"));
}

#[tokio::test]
async fn deletion_forgets_the_bead() {
    let router = EventRouter::new(64);
    let mirror = StatusMirror::spawn(&router).unwrap();

    router
        .emit(Event::ticket(EventKind::TicketChanged {
            before: None,
            after: Some(bead("a", "closed")),
        }))
        .unwrap();
    settle().await;
    assert!(mirror.is_closed("a"));

    router
        .emit(Event::ticket(EventKind::TicketChanged {
            before: Some(bead("a", "closed")),
            after: None,
        }))
        .unwrap();
    settle().await;
    assert!(mirror.status("a").is_none());
    assert!(!mirror.is_closed("a"));
}

#[tokio::test]
async fn unknown_bead_is_not_closed() {
    let router = EventRouter::new(64);
    let mirror = StatusMirror::spawn(&router).unwrap();
    assert!(!mirror.is_closed("nope"));
    assert!(mirror.status("nope").is_none());
}
