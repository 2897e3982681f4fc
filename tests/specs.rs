//! Behavioral specifications for the atari CLI.
//!
//! These tests are black-box: they invoke the CLI binary and verify
//! stdout, stderr, and exit codes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use assert_cmd::Command;

fn atari() -> Command {
    Command::cargo_bin("atari").unwrap()
}

fn stdout_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

fn stderr_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stderr.clone()).unwrap()
}

#[test]
fn help_lists_daemon_surface() {
    let assert = atari().arg("--help").assert().success();
    let out = stdout_of(&assert);
    for subcommand in ["start", "stop", "pause", "resume", "status", "retry"] {
        assert!(out.contains(subcommand), "--help missing {subcommand}");
    }
}

#[test]
fn version_prints() {
    let assert = atari().arg("--version").assert().success();
    assert!(stdout_of(&assert).contains("atari"));
}

#[test]
fn status_without_daemon_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    atari()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn pause_without_daemon_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let assert = atari()
        .current_dir(dir.path())
        .arg("pause")
        .assert()
        .failure()
        .code(1);
    assert!(stderr_of(&assert).contains("not running"));
}

#[test]
fn stop_without_daemon_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    atari()
        .current_dir(dir.path())
        .args(["stop", "--force"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn retry_without_daemon_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    atari()
        .current_dir(dir.path())
        .args(["retry", "b-1"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn change_directory_flag_is_honored() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("proj");
    std::fs::create_dir_all(project.join(".beads")).unwrap();

    // From an unrelated cwd, -C points at the project; still no daemon.
    atari()
        .current_dir(dir.path())
        .args(["-C", project.to_str().unwrap(), "status"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    atari().arg("frobnicate").assert().failure().code(2);
}
