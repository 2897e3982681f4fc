// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
#[serial_test::serial]
fn daemon_child_detection() {
    std::env::remove_var(DAEMONIZED_ENV);
    assert!(!is_daemon_child());

    std::env::set_var(DAEMONIZED_ENV, "1");
    assert!(is_daemon_child());

    std::env::set_var(DAEMONIZED_ENV, "0");
    assert!(!is_daemon_child());

    std::env::remove_var(DAEMONIZED_ENV);
}

#[test]
fn probe_rejects_missing_socket() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!probe_socket(&dir.path().join("nope.sock")));
}

#[tokio::test]
async fn wait_reports_child_death() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("never.sock");
    let mut child = std::process::Command::new("sh")
        .args(["-c", "exit 7"])
        .spawn()
        .unwrap();

    let result = wait_for_socket(&socket, &mut child).await;
    assert_eq!(result, SocketWait::ChildExited(Some(7)));
}

#[tokio::test]
async fn wait_sees_socket_come_up() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("atari.sock");

    // A child that outlives the wait.
    let mut child = std::process::Command::new("sleep").arg("5").spawn().unwrap();

    let socket_clone = socket.clone();
    let binder = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        tokio::net::UnixListener::bind(&socket_clone).unwrap()
    });

    let result = wait_for_socket(&socket, &mut child).await;
    assert_eq!(result, SocketWait::Ready);

    let _listener = binder.await.unwrap();
    let _ = child.kill();
    let _ = child.wait();
}
