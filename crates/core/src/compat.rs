// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compatibility adapter mapping diff events onto the legacy wire kinds.
//!
//! Earlier builds tailed an activity stream from the ticket tool and
//! emitted `ticket-created` / `ticket-status` / `ticket-updated` events.
//! The diff-based watcher replaced that pipeline; this mapping keeps the
//! old kinds representable for consumers that still speak them. It is not
//! on the active control path.

use crate::bead::BeadChange;
use crate::event::EventKind;

/// Translate one diff entry into the legacy event kind it would have been
/// reported as. Deletions have no legacy representation and map to `None`.
pub fn legacy_kind(change: &BeadChange) -> Option<EventKind> {
    match (&change.before, &change.after) {
        (None, Some(after)) => Some(EventKind::TicketCreated {
            bead: after.clone(),
        }),
        (Some(before), Some(after)) if before.status != after.status => {
            Some(EventKind::TicketStatus {
                bead_id: after.id.clone(),
                old_status: before.status.clone(),
                new_status: after.status.clone(),
            })
        }
        (Some(_), Some(after)) => Some(EventKind::TicketUpdated {
            bead: after.clone(),
        }),
        (Some(_), None) | (None, None) => None,
    }
}

#[cfg(test)]
#[path = "compat_tests.rs"]
mod tests;
