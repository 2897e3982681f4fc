// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event router.
//!
//! Every subscriber owns a bounded delivery channel. `emit` never blocks
//! the producer: a subscriber whose buffer is full misses that event and
//! no other subscriber is affected. Events emitted by a single producer
//! reach each non-overflowing subscriber in emission order; there is no
//! cross-producer ordering guarantee.

use crate::clock::{Clock, SystemClock};
use crate::event::Event;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Router errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("event router is closed")]
    Closed,
}

struct Inner {
    capacity: usize,
    subscribers: Mutex<HashMap<u64, mpsc::Sender<Event>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    /// Wall-clock watermark: emitted timestamps never go backwards.
    watermark: Mutex<u64>,
    dropped: AtomicU64,
}

/// Shared broadcast bus. Cheap to clone; all clones refer to the same
/// subscriber set.
#[derive(Clone)]
pub struct EventRouter {
    inner: Arc<Inner>,
}

/// One subscriber's delivery handle. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Event>,
    inner: Arc<Inner>,
}

impl EventRouter {
    /// Create a router whose subscribers each buffer up to `capacity`
    /// undelivered events.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: capacity.max(1),
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                watermark: Mutex::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> Result<Subscription, RouterError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(RouterError::Closed);
        }
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.subscribers.lock().insert(id, tx);
        Ok(Subscription {
            id,
            rx,
            inner: Arc::clone(&self.inner),
        })
    }

    /// Remove a subscriber by id. Subsequent deliveries to it become no-ops.
    pub fn unsubscribe(&self, id: u64) {
        self.inner.subscribers.lock().remove(&id);
    }

    /// Publish an event to every subscriber, without blocking.
    ///
    /// The timestamp is stamped here, from the moment of emission, and is
    /// monotonically non-decreasing across the router's lifetime.
    pub fn emit(&self, mut event: Event) -> Result<(), RouterError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(RouterError::Closed);
        }

        event.timestamp_ms = {
            let mut watermark = self.inner.watermark.lock();
            let stamped = SystemClock.epoch_ms().max(*watermark);
            *watermark = stamped;
            stamped
        };

        let mut gone = Vec::new();
        {
            let subscribers = self.inner.subscribers.lock();
            for (id, tx) in subscribers.iter() {
                match tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        // Slow consumer: this subscriber misses the event.
                        self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                        tracing::trace!(subscriber = id, kind = event.kind.name(), "dropped event");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => gone.push(*id),
                }
            }
        }
        if !gone.is_empty() {
            let mut subscribers = self.inner.subscribers.lock();
            for id in gone {
                subscribers.remove(&id);
            }
        }
        Ok(())
    }

    /// Close the router: no new subscriptions are accepted, all delivery
    /// channels are closed (buffered events remain readable), and further
    /// `emit` calls fail with [`RouterError::Closed`].
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.subscribers.lock().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Total events dropped across all subscribers since construction.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receive the next event. Returns `None` once the router is closed
    /// (or this handle unsubscribed) and the buffer is drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Non-blocking receive for drains and tests.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.subscribers.lock().remove(&self.id);
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
