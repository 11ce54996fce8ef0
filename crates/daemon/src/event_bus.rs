// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus: the single write path into the log.
//!
//! `publish` = validate → durable append → notify subscribers in
//! registration order → return. Subscribers run synchronously on the
//! publisher's call stack and observe events in append order; a subscriber
//! error (or panic) is logged and swallowed so one bad observer cannot
//! corrupt the write path.

use parking_lot::{Mutex, RwLock};
use pilot_core::{Clock, Event, SystemClock};
use pilot_engine::{EngineError, EventPublisher};
use pilot_storage::{AppendError, EventLog};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// A bus subscriber. Errors are logged and swallowed.
pub type Subscriber = Box<dyn Fn(&Event) -> Result<(), String> + Send + Sync>;

/// Synchronous fan-out bus over the append-only log.
pub struct EventBus<C: Clock = SystemClock> {
    log: Mutex<EventLog>,
    subscribers: RwLock<Vec<Subscriber>>,
    clock: C,
}

impl<C: Clock> EventBus<C> {
    pub fn new(log: EventLog, clock: C) -> Self {
        Self {
            log: Mutex::new(log),
            subscribers: RwLock::new(Vec::new()),
            clock,
        }
    }

    /// Register a subscriber. Registration order is notification order.
    pub fn subscribe(&self, handler: Subscriber) {
        self.subscribers.write().push(handler);
    }

    /// Validate, append durably, then fan out. Returns the stored event
    /// (with its assigned id) only after every subscriber has run.
    pub fn publish(&self, mut event: Event) -> Result<Event, AppendError> {
        event.timestamp = self.clock.utc_now();

        let stored = {
            let mut log = self.log.lock();
            log.append(event)?
        };

        for handler in self.subscribers.read().iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&stored)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(event = %stored.log_summary(), error = %e, "subscriber error, swallowed");
                }
                Err(_) => {
                    warn!(event = %stored.log_summary(), "subscriber panicked, swallowed");
                }
            }
        }

        Ok(stored)
    }

    /// All events, append order.
    pub fn events(&self) -> Result<Vec<Event>, AppendError> {
        self.log.lock().get_all()
    }

    /// Events of one task, append order.
    pub fn events_for_task(&self, task_id: &str) -> Result<Vec<Event>, AppendError> {
        self.log.lock().get_by_task(task_id)
    }

    /// Events by type tag, append order.
    pub fn events_by_type(&self, type_name: &str) -> Result<Vec<Event>, AppendError> {
        self.log.lock().get_by_type(type_name)
    }
}

impl<C: Clock> EventPublisher for EventBus<C> {
    fn publish(&self, event: Event) -> Result<Event, EngineError> {
        EventBus::publish(self, event).map_err(|e| EngineError::Publish(e.to_string()))
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
