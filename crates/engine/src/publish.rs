// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event publishing seam between the engine and the bus.
//!
//! Every state change the engine makes is an event published through this
//! trait. The daemon implements it with the real bus (validate, durable
//! append, subscriber fan-out); tests use the in-memory publisher.

use crate::error::EngineError;
use pilot_core::Event;

/// Synchronous event publication. Returns the stored event, with the id the
/// store assigned, so callers can thread causal links (`parent_event_id`).
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: Event) -> Result<Event, EngineError>;
}

/// In-memory publisher for tests: assigns sequential per-task ids and keeps
/// everything it saw.
#[cfg(any(test, feature = "test-support"))]
pub struct MemoryPublisher {
    events: parking_lot::Mutex<Vec<Event>>,
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryPublisher {
    pub fn new() -> Self {
        Self {
            events: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Everything published so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Type tags published so far, in order.
    pub fn type_names(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| e.type_name().to_string())
            .collect()
    }

    /// Count of events with the given type tag.
    pub fn count_of(&self, type_name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.type_name() == type_name)
            .count()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for MemoryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl EventPublisher for MemoryPublisher {
    fn publish(&self, mut event: Event) -> Result<Event, EngineError> {
        let mut events = self.events.lock();
        if event.event_id.is_empty() {
            let seq = events
                .iter()
                .filter(|e| e.task_id == event.task_id)
                .count()
                + 1;
            event.event_id = pilot_core::EventId::new(format!("ev-{seq:08}"));
        }
        events.push(event.clone());
        Ok(event)
    }
}
