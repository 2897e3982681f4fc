// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream parser for the session binary's newline-delimited JSON output.
//!
//! Each decoded frame notes watchdog activity and is lifted into typed
//! events on the router. Malformed frames produce rate-limited
//! `parse-error` events and never abort the stream; only a read error
//! (other than EOF) is surfaced to the caller.

use super::ActivityHandle;
use crate::limit::WarnLimiter;
use atari_core::{Event, EventKind, EventRouter, RouterError};
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Maximum accepted frame length (1 MiB). Longer frames are reported as a
/// parse error for that frame only; the stream continues at the next
/// newline.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// How much of an offending line a `parse-error` event carries.
const ERROR_SNIPPET_BYTES: usize = 4096;

/// Parser errors. EOF is success, not an error.
#[derive(Debug, Error)]
pub enum ParseAbort {
    #[error("session stream read failed: {0}")]
    Read(#[from] std::io::Error),
}

/// Terminal payload of the session, captured from the `result` frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub session_id: String,
    pub turns: u32,
    pub duration_ms: u64,
    pub cost_usd: f64,
    pub result: String,
}

/// Wire envelope. Unknown envelope types and content-block subtypes are
/// skipped, not errors.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    num_turns: Option<u32>,
    #[serde(default)]
    duration_ms: Option<u64>,
    #[serde(default)]
    total_cost_usd: Option<f64>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    tools: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
        #[serde(default)]
        content: serde_json::Value,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Unknown,
}

/// Line-delimited JSON decoder over a session's output stream.
pub struct StreamParser {
    router: EventRouter,
    activity: ActivityHandle,
    limiter: WarnLimiter,
    result: Option<SessionResult>,
}

impl StreamParser {
    pub fn new(router: EventRouter, activity: ActivityHandle) -> Self {
        Self {
            router,
            activity,
            limiter: WarnLimiter::default_floor(),
            result: None,
        }
    }

    /// Parse the stream to EOF.
    pub async fn run<R: AsyncRead + Unpin>(&mut self, reader: R) -> Result<(), ParseAbort> {
        let mut reader = BufReader::new(reader);
        let mut buf: Vec<u8> = Vec::new();

        loop {
            buf.clear();
            // +2 leaves room for a max-length frame plus its newline, so a
            // limit hit always means the frame itself was too long.
            let n = {
                let mut limited = (&mut reader).take(MAX_FRAME_BYTES as u64 + 2);
                limited.read_until(b'\n', &mut buf).await?
            };
            if n == 0 {
                return Ok(());
            }

            let ended = buf.last() == Some(&b'\n');
            if ended {
                buf.pop();
            } else if buf.len() == MAX_FRAME_BYTES + 2 {
                // Limit hit mid-frame: report and resynchronise.
                if self.emit_oversized(&buf).is_err() {
                    return Ok(());
                }
                skip_to_newline(&mut reader).await?;
                continue;
            }

            if buf.len() > MAX_FRAME_BYTES {
                if self.emit_oversized(&buf).is_err() {
                    return Ok(());
                }
                continue;
            }

            if self.handle_frame(&buf).is_err() {
                // Router closed: the supervisor is shutting down.
                return Ok(());
            }
        }
    }

    /// Retained `result` payload, if the session reported one.
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn take_result(&mut self) -> Option<SessionResult> {
        self.result.take()
    }

    fn handle_frame(&mut self, frame: &[u8]) -> Result<(), RouterError> {
        let line = String::from_utf8_lossy(frame);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        let envelope: Envelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                return self.emit_parse_error(trimmed, &e.to_string());
            }
        };

        self.activity.note();

        match envelope.kind.as_str() {
            "system" => {
                tracing::debug!(
                    subtype = envelope.subtype.as_deref().unwrap_or(""),
                    model = envelope.model.as_deref().unwrap_or(""),
                    tools = envelope.tools.as_ref().map(|t| t.len()).unwrap_or(0),
                    "session system frame"
                );
            }
            "assistant" => {
                for block in envelope.message.map(|m| m.content).unwrap_or_default() {
                    match block {
                        ContentBlock::Text { text } => {
                            self.emit(EventKind::SessionText { text })?;
                        }
                        ContentBlock::Thinking { thinking } => {
                            self.emit(EventKind::SessionText { text: thinking })?;
                        }
                        ContentBlock::ToolUse { id, name, input } => {
                            self.emit(EventKind::SessionToolUse { id, name, input })?;
                        }
                        ContentBlock::ToolResult { .. } | ContentBlock::Unknown => {}
                    }
                }
            }
            "user" => {
                for block in envelope.message.map(|m| m.content).unwrap_or_default() {
                    if let ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } = block
                    {
                        self.emit(EventKind::SessionToolResult {
                            id: tool_use_id,
                            content: flatten_content(&content),
                            is_error,
                        })?;
                    }
                }
            }
            "result" => {
                let result = SessionResult {
                    session_id: envelope.session_id.unwrap_or_default(),
                    turns: envelope.num_turns.unwrap_or(0),
                    duration_ms: envelope.duration_ms.unwrap_or(0),
                    cost_usd: envelope.total_cost_usd.unwrap_or(0.0),
                    result: envelope.result.unwrap_or_default(),
                };
                self.emit(EventKind::SessionEnd {
                    session_id: result.session_id.clone(),
                    turns: result.turns,
                    duration_ms: result.duration_ms,
                    cost_usd: result.cost_usd,
                    result: result.result.clone(),
                })?;
                self.result = Some(result);
            }
            other => {
                tracing::trace!(kind = other, "ignoring unknown envelope type");
            }
        }
        Ok(())
    }

    fn emit(&self, kind: EventKind) -> Result<(), RouterError> {
        self.router.emit(Event::session(kind))
    }

    fn emit_parse_error(&self, line: &str, error: &str) -> Result<(), RouterError> {
        tracing::debug!(error, "unparseable session frame");
        if !self.limiter.allow() {
            return Ok(());
        }
        self.emit(EventKind::ParseError {
            line: truncate(line, ERROR_SNIPPET_BYTES),
            error: error.to_string(),
        })
    }

    fn emit_oversized(&self, frame: &[u8]) -> Result<(), RouterError> {
        let snippet = String::from_utf8_lossy(&frame[..frame.len().min(ERROR_SNIPPET_BYTES)]);
        self.emit_parse_error(
            &snippet,
            &format!("frame exceeds {MAX_FRAME_BYTES} byte limit"),
        )
    }
}

/// Consume input until the next newline (or EOF), discarding it.
async fn skip_to_newline<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<(), std::io::Error> {
    let mut scratch = Vec::with_capacity(8 * 1024);
    loop {
        scratch.clear();
        let n = {
            let mut limited = (&mut *reader).take(64 * 1024);
            limited.read_until(b'\n', &mut scratch).await?
        };
        if n == 0 || scratch.last() == Some(&b'\n') {
            return Ok(());
        }
    }
}

/// Render a tool-result content value as a plain string.
fn flatten_content(content: &serde_json::Value) -> String {
    match content {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(blocks) => blocks
            .iter()
            .filter_map(|b| match b.get("type").and_then(|t| t.as_str()) {
                Some("text") => b.get("text").and_then(|t| t.as_str()).map(str::to_string),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
