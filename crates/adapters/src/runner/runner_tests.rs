// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::fake::{FakeChild, FakeRunner};
use super::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[test]
fn command_spec_renders_for_logs() {
    let spec = CommandSpec::new("br").arg("ready").arg("--json");
    assert_eq!(spec.display(), "br ready --json");
}

#[tokio::test]
async fn system_runner_collects_output() {
    let runner = SystemRunner::new();
    let output = runner
        .output(
            CommandSpec::new("echo").arg("hello"),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    assert!(output.exit.success);
    assert_eq!(output.stdout_str().trim(), "hello");
}

#[tokio::test]
async fn system_runner_reports_nonzero_exit() {
    let runner = SystemRunner::new();
    let output = runner
        .output(
            CommandSpec::new("sh").args(["-c", "exit 3"]),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    assert!(!output.exit.success);
    assert_eq!(output.exit.code, Some(3));
}

#[tokio::test]
async fn system_runner_times_out() {
    let runner = SystemRunner::new();
    let err = runner
        .output(
            CommandSpec::new("sleep").arg("5"),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::TimedOut { .. }));
}

#[tokio::test]
async fn system_runner_spawn_failure_is_hard_error() {
    let runner = SystemRunner::new();
    let err = runner
        .spawn(CommandSpec::new("definitely-not-a-real-binary-xyz"))
        .err();
    assert!(matches!(err, Some(RunnerError::Spawn { .. })));
}

#[tokio::test]
async fn system_runner_spawned_child_pipes_roundtrip() {
    let runner = SystemRunner::new();
    let mut child = runner.spawn(CommandSpec::new("cat")).unwrap();
    let mut stdin = child.take_stdin().unwrap();
    let mut stdout = child.take_stdout().unwrap();

    stdin.write_all(b"ping\n").await.unwrap();
    stdin.shutdown().await.unwrap();
    drop(stdin);

    let mut buf = String::new();
    stdout.read_to_string(&mut buf).await.unwrap();
    assert_eq!(buf, "ping\n");

    // cat exits after stdin closes; poll until reaped.
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break exit;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    assert!(exit.success);
}

#[tokio::test]
async fn fake_runner_serves_queue_then_default() {
    let runner = FakeRunner::new();
    runner.push_output(FakeRunner::ok_output("first"));
    runner.set_default_output(FakeRunner::ok_output("[]"));

    let spec = CommandSpec::new("br").arg("ready");
    let out1 = runner
        .output(spec.clone(), Duration::from_secs(1))
        .await
        .unwrap();
    let out2 = runner
        .output(spec.clone(), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(out1.stdout_str(), "first");
    assert_eq!(out2.stdout_str(), "[]");
    assert_eq!(runner.calls().len(), 2);
}

#[tokio::test]
async fn fake_child_records_stdin_and_kill() {
    let runner = FakeRunner::new();
    let (child, control) = FakeChild::hanging();
    runner.push_child(child);

    let mut child = runner.spawn(CommandSpec::new("claude")).unwrap();
    let mut stdin = child.take_stdin().unwrap();
    stdin.write_all(b"prompt").await.unwrap();
    stdin.shutdown().await.unwrap();

    assert_eq!(control.stdin_str(), "prompt");
    assert!(control.stdin_closed());

    assert!(child.try_wait().unwrap().is_none());
    child.start_kill().unwrap();
    assert!(control.was_killed());
    let exit = child.try_wait().unwrap().unwrap();
    assert!(!exit.success);
}
