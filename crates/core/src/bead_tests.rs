// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

fn bead(id: &str, status: &str) -> BeadSnapshot {
    BeadSnapshot {
        id: id.to_string(),
        title: format!("title-{id}"),
        status: status.to_string(),
        priority: 2,
        issue_type: "task".to_string(),
    }
}

#[test]
fn parses_record_and_ignores_extra_fields() {
    let line = r#"{"id":"b-1","title":"fix","status":"open","priority":1,"issue_type":"bug","labels":["x"]}"#;
    let snapshot = BeadSnapshot::from_json_line(line).unwrap();
    assert_eq!(snapshot.id, "b-1");
    assert_eq!(snapshot.priority, 1);
    assert_eq!(snapshot.issue_type, "bug");
}

#[yare::parameterized(
    empty_line    = { "" },
    whitespace    = { "   " },
    not_json      = { "nope" },
    empty_id      = { r#"{"id":"","title":"x"}"# },
    missing_id    = { r#"{"title":"x"}"# },
)]
fn rejects_unusable_lines(line: &str) {
    assert!(BeadSnapshot::from_json_line(line).is_none());
}

#[test]
fn load_index_skips_bad_lines() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"id":"a","title":"t","status":"open","priority":0,"issue_type":"task"}}"#)
        .unwrap();
    writeln!(file, "garbage").unwrap();
    writeln!(file, r#"{{"id":"b","title":"t","status":"open","priority":1,"issue_type":"task"}}"#)
        .unwrap();

    let index = load_index(file.path()).unwrap();
    assert_eq!(index.len(), 2);
    assert!(index.contains_key("a"));
    assert!(index.contains_key("b"));
}

#[test]
fn diff_reports_create_change_delete() {
    let mut old = BeadIndex::new();
    old.insert("a".into(), bead("a", "open"));
    old.insert("b".into(), bead("b", "open"));

    let mut new = BeadIndex::new();
    new.insert("a".into(), bead("a", "closed"));
    new.insert("c".into(), bead("c", "open"));

    let changes = diff_indexes(&old, &new);
    assert_eq!(changes.len(), 3);

    // Ordered by id: a (changed), b (deleted), c (created)
    assert_eq!(changes[0].before.as_ref().unwrap().status, "open");
    assert_eq!(changes[0].after.as_ref().unwrap().status, "closed");
    assert!(changes[1].after.is_none());
    assert_eq!(changes[1].before.as_ref().unwrap().id, "b");
    assert!(changes[2].before.is_none());
    assert_eq!(changes[2].after.as_ref().unwrap().id, "c");
}

#[test]
fn diff_of_identical_indexes_is_empty() {
    let mut index = BeadIndex::new();
    index.insert("a".into(), bead("a", "open"));
    assert!(diff_indexes(&index, &index.clone()).is_empty());
}

#[yare::parameterized(
    closed    = { "closed", true },
    done      = { "done", true },
    completed = { "completed", true },
    open      = { "open", false },
    progress  = { "in_progress", false },
)]
fn closed_statuses(status: &str, expected: bool) {
    assert_eq!(is_closed_status(status), expected);
}
