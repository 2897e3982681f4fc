// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atari_core::{Event, EventKind};
use std::time::Duration;

#[tokio::test]
async fn events_are_appended_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.log");
    let router = EventRouter::new(64);
    let sink = spawn_sink(&router, path.clone()).unwrap();

    router
        .emit(Event::internal(EventKind::DrainStart))
        .unwrap();
    router
        .emit(Event::internal(EventKind::DrainStop {
            reason: "test".to_string(),
        }))
        .unwrap();

    router.close();
    tokio::time::timeout(Duration::from_secs(2), sink)
        .await
        .unwrap()
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["type"], "drain-start");
    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["type"], "drain-stop");
    assert_eq!(second["reason"], "test");
}

#[test]
fn small_log_is_not_rotated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.log");
    std::fs::write(&path, "little\n").unwrap();
    rotate_if_needed(&path);
    assert!(path.exists());
    assert!(!dir.path().join("events.log.1").exists());
}

#[test]
fn oversized_log_rotates_with_shift() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.log");
    std::fs::write(&path, vec![b'x'; 10 * 1024 * 1024]).unwrap();
    std::fs::write(dir.path().join("events.log.1"), "old-1").unwrap();

    rotate_if_needed(&path);

    assert!(!path.exists());
    let rotated = std::fs::read_to_string(dir.path().join("events.log.2")).unwrap();
    assert_eq!(rotated, "old-1");
    assert!(dir.path().join("events.log.1").exists());
}
