// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bead status mirror.
//!
//! The watcher's index never crosses its task boundary; the controller
//! tracks ticket status from the event copies instead. This keeps a
//! private id → status map fed by a router subscription.

use atari_core::bead::is_closed_status;
use atari_core::{EventKind, EventRouter, RouterError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Last-known bead statuses, fed from `ticket-changed` events.
#[derive(Clone)]
pub struct StatusMirror {
    statuses: Arc<Mutex<HashMap<String, String>>>,
}

impl StatusMirror {
    /// Subscribe to the router and spawn the mirror task. The task ends
    /// when the router closes.
    pub fn spawn(router: &EventRouter) -> Result<Self, RouterError> {
        let mut sub = router.subscribe()?;
        let statuses: Arc<Mutex<HashMap<String, String>>> = Arc::default();
        let mirror = Self {
            statuses: Arc::clone(&statuses),
        };
        tokio::spawn(async move {
            while let Some(event) = sub.recv().await {
                if let EventKind::TicketChanged { before, after } = event.kind {
                    let mut statuses = statuses.lock();
                    match after {
                        Some(after) => {
                            statuses.insert(after.id, after.status);
                        }
                        None => {
                            if let Some(before) = before {
                                statuses.remove(&before.id);
                            }
                        }
                    }
                }
            }
            tracing::debug!("status mirror stopped");
        });
        Ok(mirror)
    }

    pub fn status(&self, id: &str) -> Option<String> {
        self.statuses.lock().get(id).cloned()
    }

    /// Whether the bead's last observed status is terminally closed.
    pub fn is_closed(&self, id: &str) -> bool {
        self.statuses
            .lock()
            .get(id)
            .map(|s| is_closed_status(s))
            .unwrap_or(false)
    }

    #[cfg(test)]
    pub(crate) fn set_status(&self, id: &str, status: &str) {
        self.statuses
            .lock()
            .insert(id.to_string(), status.to_string());
    }
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
