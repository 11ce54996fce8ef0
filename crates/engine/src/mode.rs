// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mode manager: owns `(mode, stage)` and enforces the action matrix.

use crate::error::EngineError;
use crate::publish::EventPublisher;
use pilot_core::{Event, EventKind, Mode, Stage, TaskId, ToolAction};
use std::sync::Arc;

/// Result of a mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub changed: bool,
    pub from_mode: Mode,
    pub to_mode: Mode,
}

/// Result of a non-enforcing permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCheck {
    pub allowed: bool,
    pub violation: Option<String>,
}

/// Owns the task's permission envelope.
pub struct ModeManager {
    task_id: TaskId,
    mode: Mode,
    stage: Stage,
    publisher: Arc<dyn EventPublisher>,
}

impl ModeManager {
    pub fn new(task_id: TaskId, initial_mode: Mode, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            task_id,
            mode: initial_mode,
            stage: Stage::None,
            publisher,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Adopt a mode without emitting a change event. Used at intent intake
    /// (the mode arrives on `intent_received`) and crash recovery (the mode
    /// is replayed from the log).
    pub fn adopt(&mut self, mode: Mode) {
        if self.mode == Mode::Mission && mode != Mode::Mission {
            self.stage = Stage::None;
        }
        self.mode = mode;
    }

    /// Adopt a stage without emitting a change event (crash recovery).
    pub fn adopt_stage(&mut self, stage: Stage) {
        if self.mode == Mode::Mission {
            self.stage = stage;
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Change mode, emitting `mode_changed` when it actually changes.
    ///
    /// Leaving MISSION resets the stage to `none`; staying in MISSION
    /// preserves it.
    pub fn set_mode(&mut self, to: Mode) -> Result<ModeChange, EngineError> {
        let from = self.mode;
        if from == to {
            return Ok(ModeChange {
                changed: false,
                from_mode: from,
                to_mode: to,
            });
        }

        if self.mode == Mode::Mission && to != Mode::Mission {
            self.stage = Stage::None;
        }
        self.mode = to;

        self.publisher.publish(Event::new(
            self.task_id.clone(),
            to,
            self.stage,
            EventKind::ModeChanged { from, to },
        ))?;

        Ok(ModeChange {
            changed: true,
            from_mode: from,
            to_mode: to,
        })
    }

    /// Change stage, emitting `stage_changed`. Fails outside MISSION for
    /// any stage other than `none`.
    pub fn set_stage(&mut self, to: Stage) -> Result<(), EngineError> {
        if to != Stage::None && self.mode != Mode::Mission {
            return Err(EngineError::StageOutsideMission {
                stage: to,
                mode: self.mode,
            });
        }
        let from = self.stage;
        if from == to {
            return Ok(());
        }
        self.stage = to;

        self.publisher.publish(Event::new(
            self.task_id.clone(),
            self.mode,
            to,
            EventKind::StageChanged { from, to },
        ))?;

        Ok(())
    }

    /// Check an action against the matrix without side effects.
    pub fn validate_action(&self, action: ToolAction) -> ActionCheck {
        if action.allowed_in(self.mode, self.stage) {
            ActionCheck {
                allowed: true,
                violation: None,
            }
        } else {
            ActionCheck {
                allowed: false,
                violation: Some(format!(
                    "{action} not permitted in {}/{}",
                    self.mode, self.stage
                )),
            }
        }
    }

    /// Enforce an action: on rejection emit exactly one `mode_violation`
    /// event and return `false`.
    pub fn enforce_action(&self, action: ToolAction) -> Result<bool, EngineError> {
        let check = self.validate_action(action);
        if check.allowed {
            return Ok(true);
        }

        self.publisher.publish(Event::new(
            self.task_id.clone(),
            self.mode,
            self.stage,
            EventKind::ModeViolation {
                action,
                message: check.violation.unwrap_or_default(),
            },
        ))?;

        Ok(false)
    }
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod tests;
