// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types published on the supervisor's event router.
//!
//! Serializes with `{"type": "kind-name", ...fields}` format so the
//! events.log file and any future wire consumers dispatch on a single
//! discriminator.

use crate::bead::BeadSnapshot;
use crate::state::ControllerState;
use serde::{Deserialize, Serialize};

/// Which component produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventSource {
    Session,
    TicketWatch,
    Internal,
}

/// Severity for out-of-band error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// An event as delivered to subscribers.
///
/// `timestamp_ms` is stamped by the router at emission time and is
/// monotonically non-decreasing across all events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub source: EventSource,
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn session(kind: EventKind) -> Self {
        Self::new(EventSource::Session, kind)
    }

    pub fn ticket(kind: EventKind) -> Self {
        Self::new(EventSource::TicketWatch, kind)
    }

    pub fn internal(kind: EventKind) -> Self {
        Self::new(EventSource::Internal, kind)
    }

    fn new(source: EventSource, kind: EventKind) -> Self {
        Self {
            source,
            timestamp_ms: 0,
            kind,
        }
    }
}

/// Closed sum of everything the supervisor can observe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventKind {
    // -- ticket file --
    /// Diff entry from the ticket-state watcher. Either side may be absent
    /// to signal creation (`before`) or deletion (`after`).
    TicketChanged {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before: Option<BeadSnapshot>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after: Option<BeadSnapshot>,
    },

    /// Legacy wire kind, produced only by the compatibility adapter.
    TicketCreated { bead: BeadSnapshot },

    /// Legacy wire kind, produced only by the compatibility adapter.
    TicketStatus {
        bead_id: String,
        old_status: String,
        new_status: String,
    },

    /// Legacy wire kind, produced only by the compatibility adapter.
    TicketUpdated { bead: BeadSnapshot },

    // -- session stream --
    SessionText { text: String },

    SessionToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    SessionToolResult {
        id: String,
        content: String,
        is_error: bool,
    },

    SessionStart { bead_id: String },

    SessionEnd {
        session_id: String,
        turns: u32,
        duration_ms: u64,
        cost_usd: f64,
        result: String,
    },

    SessionTimeout { elapsed_ms: u64 },

    // -- controller --
    IterationStart { bead_id: String, attempt: u32 },

    IterationEnd {
        bead_id: String,
        success: bool,
        turns: u32,
        cost_usd: f64,
    },

    DrainStart,

    DrainStop { reason: String },

    StateChanged {
        from: ControllerState,
        to: ControllerState,
    },

    BeadAbandoned {
        bead_id: String,
        attempts: u32,
        max_failures: u32,
    },

    // -- diagnostics --
    ParseError { line: String, error: String },

    Error {
        severity: Severity,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bead_id: Option<String>,
    },
}

impl EventKind {
    /// Wire discriminator for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TicketChanged { .. } => "ticket-changed",
            Self::TicketCreated { .. } => "ticket-created",
            Self::TicketStatus { .. } => "ticket-status",
            Self::TicketUpdated { .. } => "ticket-updated",
            Self::SessionText { .. } => "session-text",
            Self::SessionToolUse { .. } => "session-tool-use",
            Self::SessionToolResult { .. } => "session-tool-result",
            Self::SessionStart { .. } => "session-start",
            Self::SessionEnd { .. } => "session-end",
            Self::SessionTimeout { .. } => "session-timeout",
            Self::IterationStart { .. } => "iteration-start",
            Self::IterationEnd { .. } => "iteration-end",
            Self::DrainStart => "drain-start",
            Self::DrainStop { .. } => "drain-stop",
            Self::StateChanged { .. } => "state-changed",
            Self::BeadAbandoned { .. } => "bead-abandoned",
            Self::ParseError { .. } => "parse-error",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
