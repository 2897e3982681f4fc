// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runner::fake::{FakeChild, FakeRunner};
use atari_core::EventKind;
use std::time::Duration;

fn spec_with_timeout(timeout: Duration) -> SessionSpec {
    SessionSpec {
        binary: "claude".to_string(),
        extra_args: vec!["--model".to_string(), "opus".to_string()],
        max_turns: Some(30),
        timeout,
        stderr_cap: 1024,
    }
}

fn manager_with(
    runner: Arc<FakeRunner>,
    timeout: Duration,
) -> (SessionManager, EventRouter) {
    let router = EventRouter::new(256);
    let manager = SessionManager::new(spec_with_timeout(timeout), router.clone(), runner);
    (manager, router)
}

#[tokio::test]
async fn start_writes_prompt_and_keeps_stdin_open() {
    let runner = Arc::new(FakeRunner::new());
    let (child, control) = FakeChild::hanging();
    runner.push_child(child);
    let (manager, _router) = manager_with(Arc::clone(&runner), Duration::from_secs(60));

    let _stdout = manager.start("do the work").await.unwrap();

    assert_eq!(control.stdin_str(), "do the work\n");
    assert!(!control.stdin_closed());

    // Fixed flags, then the turn cap, then caller extras.
    let call = &runner.calls()[0];
    assert_eq!(call.program, "claude");
    assert_eq!(
        call.args,
        vec![
            "--print",
            "--verbose",
            "--output-format",
            "stream-json",
            "--max-turns",
            "30",
            "--model",
            "opus"
        ]
    );

    manager.stop();
}

#[tokio::test]
async fn double_start_fails() {
    let runner = Arc::new(FakeRunner::new());
    let (child, _control) = FakeChild::hanging();
    runner.push_child(child);
    let (manager, _router) = manager_with(Arc::clone(&runner), Duration::from_secs(60));

    manager.start("p").await.unwrap();
    assert!(matches!(
        manager.start("p").await,
        Err(SessionError::AlreadyStarted)
    ));
    manager.stop();
}

#[tokio::test]
async fn spawn_failure_is_a_hard_error() {
    let runner = Arc::new(FakeRunner::new());
    runner.fail_spawns();
    let (manager, _router) = manager_with(Arc::clone(&runner), Duration::from_secs(60));
    assert!(matches!(
        manager.start("p").await,
        Err(SessionError::Spawn(_))
    ));
}

#[tokio::test]
async fn wait_reaps_exit() {
    let runner = Arc::new(FakeRunner::new());
    let (child, control) = FakeChild::hanging();
    runner.push_child(child);
    let (manager, _router) = manager_with(Arc::clone(&runner), Duration::from_secs(60));

    manager.start("p").await.unwrap();
    control.exit_with(ExitInfo::failed(2));

    let exit = manager.wait().await.unwrap();
    assert!(!exit.success);
    assert_eq!(exit.code, Some(2));
}

#[tokio::test]
async fn stop_is_idempotent_and_kills() {
    let runner = Arc::new(FakeRunner::new());
    let (child, control) = FakeChild::hanging();
    runner.push_child(child);
    let (manager, _router) = manager_with(Arc::clone(&runner), Duration::from_secs(60));

    manager.start("p").await.unwrap();
    manager.stop();
    manager.stop();
    assert!(control.was_killed());

    let exit = manager.wait().await.unwrap();
    assert!(!exit.success);
    assert_eq!(exit.code, None);
}

#[tokio::test]
async fn wrap_up_appends_then_closes_stdin() {
    let runner = Arc::new(FakeRunner::new());
    let (child, control) = FakeChild::hanging();
    runner.push_child(child);
    let (manager, _router) = manager_with(Arc::clone(&runner), Duration::from_secs(60));

    manager.start("main prompt").await.unwrap();
    manager.send_wrap_up("wrap it up").await.unwrap();

    assert_eq!(control.stdin_str(), "main prompt\nwrap it up\n");
    assert!(control.stdin_closed());

    assert!(matches!(
        manager.send_wrap_up("again").await,
        Err(SessionError::WrapUpAlreadySent)
    ));
    manager.stop();
}

#[tokio::test]
async fn wrap_up_after_close_stdin_reports_no_input() {
    let runner = Arc::new(FakeRunner::new());
    let (child, control) = FakeChild::hanging();
    runner.push_child(child);
    let (manager, _router) = manager_with(Arc::clone(&runner), Duration::from_secs(60));

    manager.start("p").await.unwrap();
    manager.close_stdin().await.unwrap();
    assert!(control.stdin_closed());

    assert!(matches!(
        manager.send_wrap_up("w").await,
        Err(SessionError::NoStdin)
    ));
    manager.stop();
}

#[tokio::test]
async fn pause_request_is_a_one_way_flag() {
    let runner = Arc::new(FakeRunner::new());
    let (manager, _router) = manager_with(Arc::clone(&runner), Duration::from_secs(60));
    assert!(!manager.pause_requested());
    manager.request_pause();
    manager.request_pause();
    assert!(manager.pause_requested());
}

#[tokio::test]
#[serial_test::serial]
async fn watchdog_kills_silent_session() {
    std::env::set_var("ATARI_WATCHDOG_TICK_MS", "20");

    let runner = Arc::new(FakeRunner::new());
    let (child, control) = FakeChild::hanging();
    runner.push_child(child);
    // One hour of silence against a 50ms budget.
    let (manager, router) = manager_with(Arc::clone(&runner), Duration::from_millis(50));
    let mut sub = router.subscribe().unwrap();

    manager.start("p").await.unwrap();
    manager
        .activity_handle()
        .set_last_ms(SystemClock.epoch_ms().saturating_sub(60 * 60 * 1000));

    let event = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let Some(event) = sub.recv().await {
                if matches!(event.kind, EventKind::SessionTimeout { .. }) {
                    return event;
                }
            }
        }
    })
    .await
    .expect("session-timeout within one second");

    std::env::remove_var("ATARI_WATCHDOG_TICK_MS");

    match event.kind {
        EventKind::SessionTimeout { elapsed_ms } => {
            assert!(elapsed_ms >= 59 * 60 * 1000, "elapsed_ms = {elapsed_ms}");
        }
        _ => unreachable!(),
    }
    assert!(manager.timed_out());
    assert!(control.was_killed());

    let exit = manager.wait().await.unwrap();
    assert!(!exit.success);
}

#[tokio::test]
async fn stderr_is_captured_bounded() {
    let runner = Arc::new(FakeRunner::new());
    let (child, control) = FakeChild::hanging();
    let child = child.with_stderr("warning: something odd\n");
    runner.push_child(child);
    let (manager, _router) = manager_with(Arc::clone(&runner), Duration::from_secs(60));

    manager.start("p").await.unwrap();
    control.exit_with(ExitInfo::ok());
    manager.wait().await.unwrap();

    // Capture task races the exit; give it a beat.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(manager.stderr_string().contains("something odd"));
}
