// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atari_daemon::protocol::{read_message, write_message};
use serde_json::json;
use tokio::net::UnixListener;

/// Serve exactly one connection with the given responder.
fn serve_once<F>(listener: UnixListener, respond: F)
where
    F: FnOnce(Request) -> Option<Response> + Send + 'static,
{
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (mut reader, mut writer) = stream.into_split();
        let bytes = read_message(&mut reader).await.unwrap();
        let request: Request = serde_json::from_slice(&bytes).unwrap();
        if let Some(response) = respond(request) {
            let data = serde_json::to_vec(&response).unwrap();
            write_message(&mut writer, &data).await.unwrap();
        } else {
            // Hold the connection open without answering.
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    });
}

#[tokio::test]
async fn missing_socket_classifies_as_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let client = RpcClient::new(dir.path().join("nope.sock"), Duration::from_secs(1));
    let err = client.status().await.unwrap_err();
    assert!(matches!(err, ClientError::NotRunningNotFound(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn dead_socket_file_classifies_as_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atari.sock");
    // Bind then drop: the file remains but nothing accepts.
    drop(UnixListener::bind(&path).unwrap());
    let client = RpcClient::new(&path, Duration::from_secs(1));
    let err = client.status().await.unwrap_err();
    assert!(matches!(err, ClientError::NotRunningRefused));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atari.sock");
    serve_once(UnixListener::bind(&path).unwrap(), |_| None);

    let client = RpcClient::new(&path, Duration::from_millis(100));
    let err = client.pause().await.unwrap_err();
    assert!(matches!(err, ClientError::TimedOut));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn daemon_error_carries_message() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atari.sock");
    serve_once(UnixListener::bind(&path).unwrap(), |request| {
        Some(Response::err(request.id, "no controller available"))
    });

    let client = RpcClient::new(&path, Duration::from_secs(1));
    let err = client.resume().await.unwrap_err();
    match &err {
        ClientError::Daemon(message) => assert_eq!(message, "no controller available"),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn successful_call_echoes_id_and_parses_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atari.sock");
    serve_once(UnixListener::bind(&path).unwrap(), |request| {
        assert_eq!(request.method, "status");
        Some(Response::ok(
            request.id,
            json!({
                "status": "idle",
                "uptime_secs": 9,
                "start_time_ms": 1000,
                "stats": {
                    "iteration": 0, "current_turns": 0, "total_seen": 0,
                    "completed": 0, "failed": 0, "abandoned": 0, "in_backoff": 0
                }
            }),
        ))
    });

    let client = RpcClient::new(&path, Duration::from_secs(1));
    let status = client.status().await.unwrap();
    assert_eq!(status.status, "idle");
    assert_eq!(status.uptime_secs, 9);
}

#[tokio::test]
async fn mismatched_id_is_a_protocol_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atari.sock");
    serve_once(UnixListener::bind(&path).unwrap(), |_| {
        Some(Response::ok(999, json!("pausing")))
    });

    let client = RpcClient::new(&path, Duration::from_secs(1));
    let err = client.pause().await.unwrap_err();
    assert!(matches!(err, ClientError::MismatchedId { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn stop_sends_force_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atari.sock");
    serve_once(UnixListener::bind(&path).unwrap(), |request| {
        assert_eq!(request.method, "stop");
        assert_eq!(request.params["force"], true);
        Some(Response::ok(request.id, json!("stopping")))
    });

    let client = RpcClient::new(&path, Duration::from_secs(1));
    assert_eq!(client.stop(true).await.unwrap(), "stopping");
}
