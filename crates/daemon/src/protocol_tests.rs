// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn request_roundtrips() {
    let request = Request::new("stop", json!({"force": true}), 7);
    let bytes = serde_json::to_vec(&request).unwrap();
    let back: Request = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(back, request);
}

#[test]
fn request_params_default_to_null() {
    let back: Request = serde_json::from_str(r#"{"method":"status","id":1}"#).unwrap();
    assert_eq!(back.method, "status");
    assert!(back.params.is_null());
}

#[test]
fn response_error_shape() {
    let response = Response::err(3, "no controller available");
    assert!(response.is_err());
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["error"], "no controller available");
    assert_eq!(json["id"], 3);

    let ok = Response::ok(4, json!("pausing"));
    assert!(!ok.is_err());
    assert_eq!(serde_json::to_value(&ok).unwrap()["error"], "");
}

#[test]
fn stop_and_retry_params_decode_leniently() {
    let stop: StopParams = serde_json::from_value(json!({})).unwrap();
    assert!(!stop.force);
    let stop: StopParams = serde_json::from_value(json!({"force": true})).unwrap();
    assert!(stop.force);

    let retry: RetryParams = serde_json::from_value(json!({})).unwrap();
    assert!(retry.bead_id.is_none());
    let retry: RetryParams = serde_json::from_value(json!({"bead_id":"b-1"})).unwrap();
    assert_eq!(retry.bead_id.as_deref(), Some("b-1"));
}

#[tokio::test]
async fn wire_roundtrip() {
    let request = Request::new("status", serde_json::Value::Null, 42);
    let mut buf = Vec::new();
    let data = serde_json::to_vec(&request).unwrap();
    write_message(&mut buf, &data).await.unwrap();

    // 4-byte big-endian prefix.
    assert_eq!(
        u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize,
        data.len()
    );

    let mut cursor = std::io::Cursor::new(buf);
    let bytes = read_message(&mut cursor).await.unwrap();
    let back: Request = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(back, request);
}

#[tokio::test]
async fn oversized_length_prefix_is_rejected() {
    let mut frame = Vec::new();
    frame.extend_from_slice(&((MAX_MESSAGE_SIZE as u32) + 1).to_be_bytes());
    frame.extend_from_slice(b"xx");
    let mut cursor = std::io::Cursor::new(frame);
    assert!(matches!(
        read_message(&mut cursor).await,
        Err(ProtocolError::MessageTooLarge { .. })
    ));
}

#[tokio::test]
async fn closed_stream_reports_connection_closed() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    assert!(matches!(
        read_message(&mut cursor).await,
        Err(ProtocolError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn read_request_times_out() {
    // A reader that never produces data.
    let (client, _server) = tokio::io::duplex(64);
    let (mut read_half, _write_half) = tokio::io::split(client);
    let result = read_request(&mut read_half, std::time::Duration::from_millis(50)).await;
    assert!(matches!(result, Err(ProtocolError::Timeout)));
}

#[test]
fn status_result_from_snapshot() {
    let snapshot = atari_engine::StatusSnapshot {
        state: atari_core::ControllerState::Paused,
        current_bead: Some("b-1".to_string()),
        uptime_ms: 12_500,
        start_time_ms: 99,
        stats: atari_core::QueueStats::default(),
    };
    let result = StatusResult::from(snapshot);
    assert_eq!(result.status, "paused");
    assert_eq!(result.uptime_secs, 12);
    assert_eq!(result.current_bead.as_deref(), Some("b-1"));
}
