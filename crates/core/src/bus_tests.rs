// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::EventKind;

fn text_event(text: &str) -> Event {
    Event::session(EventKind::SessionText {
        text: text.to_string(),
    })
}

#[tokio::test]
async fn delivers_in_emission_order() {
    let router = EventRouter::new(16);
    let mut sub = router.subscribe().unwrap();

    for i in 0..5 {
        router.emit(text_event(&format!("e{i}"))).unwrap();
    }

    for i in 0..5 {
        let event = sub.recv().await.unwrap();
        match event.kind {
            EventKind::SessionText { text } => assert_eq!(text, format!("e{i}")),
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}

#[tokio::test]
async fn timestamps_never_decrease() {
    let router = EventRouter::new(16);
    let mut sub = router.subscribe().unwrap();

    for _ in 0..10 {
        router.emit(text_event("x")).unwrap();
    }

    let mut last = 0;
    for _ in 0..10 {
        let event = sub.recv().await.unwrap();
        assert!(event.timestamp_ms >= last);
        last = event.timestamp_ms;
    }
}

#[tokio::test]
async fn full_subscriber_misses_event_others_unaffected() {
    let router = EventRouter::new(2);
    let mut slow = router.subscribe().unwrap();
    let mut fast = router.subscribe().unwrap();

    // Three emits against capacity two: slow (not draining) misses one.
    for i in 0..3 {
        router.emit(text_event(&format!("e{i}"))).unwrap();
    }

    let mut slow_got = 0;
    while slow.try_recv().is_some() {
        slow_got += 1;
    }
    assert_eq!(slow_got, 2);
    assert_eq!(router.dropped(), 1);

    let mut fast_got = 0;
    while fast.try_recv().is_some() {
        fast_got += 1;
    }
    // fast also has capacity 2 and was not drained either; the point is
    // the producer never blocked and each subscriber kept its own window.
    assert_eq!(fast_got, 2);
}

#[tokio::test]
async fn emit_after_close_is_an_error() {
    let router = EventRouter::new(4);
    let mut sub = router.subscribe().unwrap();
    router.emit(text_event("before")).unwrap();
    router.close();

    assert_eq!(router.emit(text_event("after")), Err(RouterError::Closed));
    assert!(router.subscribe().is_err());

    // Buffered event still drains, then the channel ends.
    assert!(sub.recv().await.is_some());
    assert!(sub.recv().await.is_none());
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let router = EventRouter::new(4);
    let sub = router.subscribe().unwrap();
    let id = sub.id();
    router.unsubscribe(id);
    router.emit(text_event("x")).unwrap();

    let mut sub = sub;
    assert!(sub.recv().await.is_none());
}

#[tokio::test]
async fn dropping_subscription_unsubscribes() {
    let router = EventRouter::new(4);
    {
        let _sub = router.subscribe().unwrap();
    }
    // No subscriber left; emit still succeeds.
    router.emit(text_event("x")).unwrap();
    assert_eq!(router.dropped(), 0);
}

#[tokio::test]
async fn parallel_emitters_are_safe() {
    let router = EventRouter::new(256);
    let mut sub = router.subscribe().unwrap();

    let mut handles = Vec::new();
    for producer in 0..4 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..16 {
                router.emit(text_event(&format!("p{producer}-{i}"))).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut seen: Vec<String> = Vec::new();
    while let Some(event) = sub.try_recv() {
        if let EventKind::SessionText { text } = event.kind {
            seen.push(text);
        }
    }
    assert_eq!(seen.len(), 64);

    // Per-producer order is preserved even though producers interleave.
    for producer in 0..4 {
        let prefix = format!("p{producer}-");
        let ours: Vec<_> = seen.iter().filter(|t| t.starts_with(&prefix)).collect();
        for (i, text) in ours.iter().enumerate() {
            assert_eq!(**text, format!("p{producer}-{i}"));
        }
    }
}
