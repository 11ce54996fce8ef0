// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded automatic repair with escalation.
//!
//! Each failed test round may start one repair attempt. When the attempts
//! budget is spent the tracker emits `repair_exhausted` followed by a
//! blocking decision point offering the user the standard ways out.

use crate::error::EngineError;
use crate::publish::EventPublisher;
use parking_lot::Mutex;
use pilot_core::{
    DecisionOption, Event, EventKind, IdGen, Mode, Stage, TaskId, UuidIdGen,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Options offered when automatic repair gives up.
fn exhaustion_options() -> Vec<DecisionOption> {
    vec![
        DecisionOption::new("Retry")
            .description("Run another repair round")
            .recommended(),
        DecisionOption::new("Open logs").description("Inspect the failing output"),
        DecisionOption::new("Manual").description("Take over and fix it by hand"),
        DecisionOption::new("Create plan").description("Step back and plan the fix"),
    ]
}

/// Per-task repair attempt accounting.
pub struct RepairTracker<G: IdGen = UuidIdGen> {
    publisher: Arc<dyn EventPublisher>,
    idgen: G,
    max_attempts: u32,
    attempts: Mutex<HashMap<String, u32>>,
}

impl RepairTracker<UuidIdGen> {
    pub fn new(publisher: Arc<dyn EventPublisher>, max_attempts: u32) -> Self {
        Self::with_idgen(publisher, UuidIdGen, max_attempts)
    }
}

impl<G: IdGen> RepairTracker<G> {
    pub fn with_idgen(publisher: Arc<dyn EventPublisher>, idgen: G, max_attempts: u32) -> Self {
        Self {
            publisher,
            idgen,
            max_attempts,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Current attempt count for a task.
    pub fn attempts(&self, task_id: &TaskId) -> u32 {
        self.attempts
            .lock()
            .get(task_id.as_str())
            .copied()
            .unwrap_or(0)
    }

    /// Start the next repair attempt, emitting `repair_started`.
    ///
    /// When the budget is already spent this emits `repair_exhausted` plus
    /// a blocking `decision_point_needed` and fails with
    /// [`EngineError::RepairExhausted`]; no attempt starts.
    pub fn begin_attempt(&self, task_id: &TaskId) -> Result<u32, EngineError> {
        let next = {
            let attempts = self.attempts.lock();
            attempts.get(task_id.as_str()).copied().unwrap_or(0) + 1
        };

        if next > self.max_attempts {
            self.publisher.publish(Event::new(
                task_id.clone(),
                Mode::Mission,
                Stage::Repair,
                EventKind::RepairExhausted {
                    attempts: self.max_attempts,
                },
            ))?;
            self.publisher.publish(Event::new(
                task_id.clone(),
                Mode::Mission,
                Stage::Repair,
                EventKind::DecisionPointNeeded {
                    decision_id: format!("dp-{}", self.idgen.next()),
                    context: format!(
                        "Automatic repair gave up after {} attempt(s).",
                        self.max_attempts
                    ),
                    options: exhaustion_options(),
                    blocking: true,
                },
            ))?;
            return Err(EngineError::RepairExhausted {
                attempts: self.max_attempts,
            });
        }

        self.publisher.publish(Event::new(
            task_id.clone(),
            Mode::Mission,
            Stage::Repair,
            EventKind::RepairStarted {
                attempt: next,
                max_attempts: self.max_attempts,
            },
        ))?;
        self.attempts
            .lock()
            .insert(task_id.as_str().to_string(), next);
        Ok(next)
    }

    /// Record a successful repair; the counter resets so later failures get
    /// a fresh budget.
    pub fn succeed(&self, task_id: &TaskId) -> Result<(), EngineError> {
        let attempt = self.attempts(task_id);
        self.publisher.publish(Event::new(
            task_id.clone(),
            Mode::Mission,
            Stage::Repair,
            EventKind::RepairSucceeded { attempt },
        ))?;
        self.attempts.lock().remove(task_id.as_str());
        Ok(())
    }

    /// Drop a task's counter (task finished or discarded).
    pub fn clear(&self, task_id: &TaskId) {
        self.attempts.lock().remove(task_id.as_str());
    }
}

#[cfg(test)]
#[path = "repair_tests.rs"]
mod tests;
