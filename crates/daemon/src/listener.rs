// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! Each accepted connection is handled on its own task: one request, one
//! response, bounded by the read deadline. Control requests translate
//! into method calls on the controller.

use crate::protocol::{self, ProtocolError, Request, Response, RetryParams, StatusResult,
    StopParams};
use atari_engine::Controller;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

/// Delay between answering a force stop and shutting the daemon down.
const FORCE_STOP_DELAY: Duration = Duration::from_millis(50);

/// Delay between answering a graceful stop and shutting the daemon down.
const GRACEFUL_STOP_DELAY: Duration = Duration::from_millis(100);

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub controller: Option<Controller>,
    pub shutdown: Arc<Notify>,
    pub read_timeout: Duration,
}

/// Listener task for accepting socket connections.
pub struct Listener {
    socket: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(socket: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { socket, ctx }
    }

    /// Run the accept loop, spawning a task per connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            match e {
                                ProtocolError::ConnectionClosed => debug!("client disconnected"),
                                ProtocolError::Timeout => warn!("connection timeout"),
                                _ => error!("connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection: one request, one response.
async fn handle_connection(stream: UnixStream, ctx: &ListenCtx) -> Result<(), ProtocolError> {
    let (mut reader, mut writer) = stream.into_split();

    // A frame that does not decode still gets exactly one response; the
    // request id is unknown, so zero is echoed.
    let response = match protocol::read_request(&mut reader, ctx.read_timeout).await {
        Ok(request) => {
            debug!(method = %request.method, id = request.id, "received request");
            handle_request(&request, ctx)
        }
        Err(ProtocolError::Json(e)) => Response::err(0, format!("invalid request: {e}")),
        Err(e) => return Err(e),
    };

    protocol::write_response(&mut writer, &response, ctx.read_timeout).await
}

/// Dispatch one request onto the controller.
fn handle_request(request: &Request, ctx: &ListenCtx) -> Response {
    let id = request.id;
    let Some(controller) = &ctx.controller else {
        return Response::err(id, "no controller available");
    };

    match request.method.as_str() {
        "status" => match serde_json::to_value(StatusResult::from(controller.status())) {
            Ok(result) => Response::ok(id, result),
            Err(e) => Response::err(id, format!("status unavailable: {e}")),
        },

        "pause" => {
            controller.request_pause();
            Response::ok(id, serde_json::Value::String("pausing".to_string()))
        }

        "resume" => {
            controller.request_resume();
            Response::ok(id, serde_json::Value::String("resuming".to_string()))
        }

        "stop" => {
            let params: StopParams = match serde_json::from_value(request.params.clone()) {
                Ok(params) => params,
                Err(_) if request.params.is_null() => StopParams::default(),
                Err(e) => return Response::err(id, format!("invalid params: {e}")),
            };
            controller.request_stop(params.force);
            schedule_shutdown(ctx, params.force);
            Response::ok(id, serde_json::Value::String("stopping".to_string()))
        }

        "retry" => {
            let params: RetryParams = match serde_json::from_value(request.params.clone()) {
                Ok(params) => params,
                Err(_) if request.params.is_null() => RetryParams::default(),
                Err(e) => return Response::err(id, format!("invalid params: {e}")),
            };
            let cleared = controller.clear_backoff(params.bead_id.as_deref());
            debug!(cleared, "backoff cleared");
            Response::ok(id, serde_json::Value::String("ok".to_string()))
        }

        other => Response::err(id, format!("unknown method: {other}")),
    }
}

/// Give the stop response time to flush, then signal daemon shutdown.
fn schedule_shutdown(ctx: &ListenCtx, force: bool) {
    let shutdown = Arc::clone(&ctx.shutdown);
    let delay = if force {
        FORCE_STOP_DELAY
    } else {
        GRACEFUL_STOP_DELAY
    };
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        shutdown.notify_one();
    });
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
