// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex as PlMutex;
use pilot_core::test_support::intent_event;
use pilot_core::{Behavior, FakeClock};
use std::sync::Arc;
use tempfile::TempDir;

fn bus() -> (TempDir, Arc<EventBus<FakeClock>>) {
    let dir = TempDir::new().unwrap();
    let log = EventLog::open(&dir.path().join("events.jsonl")).unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_767_009_600_000);
    (dir, Arc::new(EventBus::new(log, clock)))
}

#[test]
fn publish_appends_and_returns_stored_event() {
    let (_dir, bus) = bus();
    let stored = bus
        .publish(intent_event("task-1", "hello", Behavior::Answer))
        .unwrap();

    assert_eq!(stored.event_id, "ev-00000001");
    assert_eq!(bus.events().unwrap().len(), 1);
}

#[test]
fn subscribers_observe_events_in_registration_order() {
    let (_dir, bus) = bus();
    let seen: Arc<PlMutex<Vec<String>>> = Arc::new(PlMutex::new(Vec::new()));

    for name in ["first", "second", "third"] {
        let seen = seen.clone();
        bus.subscribe(Box::new(move |event| {
            seen.lock().push(format!("{name}:{}", event.type_name()));
            Ok(())
        }));
    }

    bus.publish(intent_event("task-1", "hello", Behavior::Answer))
        .unwrap();

    assert_eq!(
        *seen.lock(),
        vec![
            "first:intent_received",
            "second:intent_received",
            "third:intent_received",
        ]
    );
}

#[test]
fn subscriber_errors_are_swallowed() {
    let (_dir, bus) = bus();
    let seen: Arc<PlMutex<u32>> = Arc::new(PlMutex::new(0));

    bus.subscribe(Box::new(|_| Err("observer exploded".to_string())));
    let seen_clone = seen.clone();
    bus.subscribe(Box::new(move |_| {
        *seen_clone.lock() += 1;
        Ok(())
    }));

    // The failing subscriber neither fails the publish nor starves the next
    bus.publish(intent_event("task-1", "hello", Behavior::Answer))
        .unwrap();
    assert_eq!(*seen.lock(), 1);
    assert_eq!(bus.events().unwrap().len(), 1);
}

#[test]
fn subscriber_panics_are_swallowed() {
    let (_dir, bus) = bus();
    bus.subscribe(Box::new(|_| panic!("bad observer")));

    let stored = bus.publish(intent_event("task-1", "hello", Behavior::Answer));
    assert!(stored.is_ok());
}

#[test]
fn rejected_events_do_not_reach_subscribers() {
    let (_dir, bus) = bus();
    let seen: Arc<PlMutex<u32>> = Arc::new(PlMutex::new(0));
    let seen_clone = seen.clone();
    bus.subscribe(Box::new(move |_| {
        *seen_clone.lock() += 1;
        Ok(())
    }));

    // stage outside MISSION violates an append invariant
    let bad = pilot_core::test_support::event_at(
        "task-1",
        pilot_core::Mode::Answer,
        pilot_core::Stage::Edit,
        pilot_core::EventKind::ExecutionPaused,
    );
    assert!(bus.publish(bad).is_err());
    assert_eq!(*seen.lock(), 0);
    assert!(bus.events().unwrap().is_empty());
}

#[test]
fn bus_stamps_timestamps_with_its_clock() {
    let dir = TempDir::new().unwrap();
    let log = EventLog::open(&dir.path().join("events.jsonl")).unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_767_009_655_500);
    let bus = EventBus::new(log, clock);

    // The factory's fixed timestamp is overwritten at publish time
    let stored = bus
        .publish(intent_event("task-1", "hello", Behavior::Answer))
        .unwrap();
    assert_eq!(stored.timestamp.timestamp_millis(), 1_767_009_655_500);
}
