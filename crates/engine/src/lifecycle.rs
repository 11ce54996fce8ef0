// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task lifecycle controller.
//!
//! Drives intake → planning → (mission) staged execution → completion, with
//! orthogonal pause/resume/stop. Every phase operation emits exactly one
//! dedicated event; an operation called outside its permitted status fails
//! with a descriptive error and changes nothing.

use crate::error::EngineError;
use crate::mode::ModeManager;
use crate::publish::EventPublisher;
use pilot_core::{
    Behavior, Event, EventKind, Mode, Plan, Stage, TaskId, TaskStatus,
};
use std::sync::Arc;

/// What completing the planning phase led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanningOutcome {
    /// PLAN mode: the plan is the deliverable, the task is complete
    TaskComplete,
    /// MISSION mode: staged execution follows
    ReadyForMission,
}

/// Owns one task's status and its mode manager.
pub struct LifecycleController {
    task_id: TaskId,
    status: TaskStatus,
    modes: ModeManager,
    publisher: Arc<dyn EventPublisher>,
}

impl LifecycleController {
    pub fn new(task_id: TaskId, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            modes: ModeManager::new(task_id.clone(), Mode::Answer, publisher.clone()),
            task_id,
            status: TaskStatus::Idle,
            publisher,
        }
    }

    /// Rebuild a controller from a projected task state (crash recovery or
    /// a restarted host). No events are emitted.
    pub fn restore(
        task_id: TaskId,
        publisher: Arc<dyn EventPublisher>,
        mode: Mode,
        stage: Stage,
        status: TaskStatus,
    ) -> Self {
        let mut controller = Self::new(task_id, publisher);
        controller.modes.adopt(mode);
        controller.modes.adopt_stage(stage);
        controller.status = status;
        controller
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn modes(&self) -> &ModeManager {
        &self.modes
    }

    pub fn modes_mut(&mut self) -> &mut ModeManager {
        &mut self.modes
    }

    fn require_status(&self, phase: &str, permitted: &[TaskStatus]) -> Result<(), EngineError> {
        if permitted.contains(&self.status) {
            Ok(())
        } else {
            Err(EngineError::InvalidPhase {
                phase: phase.to_string(),
                status: self.status,
            })
        }
    }

    fn emit(&self, kind: EventKind) -> Result<Event, EngineError> {
        self.publisher.publish(Event::new(
            self.task_id.clone(),
            self.modes.mode(),
            self.modes.stage(),
            kind,
        ))
    }

    /// Intent intake: adopt the routed mode and start running.
    pub fn intake(
        &mut self,
        prompt: &str,
        behavior: Behavior,
        confidence: f64,
        context_source: Option<String>,
        reasoning: &str,
    ) -> Result<(), EngineError> {
        self.require_status("intake", &[TaskStatus::Idle])?;

        self.modes.adopt(behavior.derived_mode());
        self.emit(EventKind::IntentReceived {
            prompt: prompt.to_string(),
            behavior,
            confidence,
            context_source,
            reasoning: reasoning.to_string(),
        })?;
        self.status = TaskStatus::Running;
        Ok(())
    }

    /// Planning: publish the plan (with its scope contract embedded).
    pub fn begin_planning(&mut self, plan: Plan) -> Result<(), EngineError> {
        self.require_status("begin_planning", &[TaskStatus::Running])?;
        self.emit(EventKind::PlanCreated { plan })?;
        Ok(())
    }

    /// Completing planning finishes a PLAN task; a MISSION task proceeds to
    /// staged execution instead.
    pub fn complete_planning(&mut self) -> Result<PlanningOutcome, EngineError> {
        self.require_status("complete_planning", &[TaskStatus::Running])?;

        if self.modes.mode() == Mode::Plan {
            self.emit(EventKind::Final {
                summary: Some("plan delivered".to_string()),
            })?;
            self.status = TaskStatus::Complete;
            Ok(PlanningOutcome::TaskComplete)
        } else {
            Ok(PlanningOutcome::ReadyForMission)
        }
    }

    /// Mission kickoff.
    pub fn start_mission(&mut self, title: Option<String>) -> Result<(), EngineError> {
        self.require_status("start_mission", &[TaskStatus::Running])?;
        if self.modes.mode() != Mode::Mission {
            return Err(EngineError::InvalidPhase {
                phase: format!("start_mission in {}", self.modes.mode()),
                status: self.status,
            });
        }
        self.emit(EventKind::MissionStarted { title })?;
        Ok(())
    }

    /// Move staged execution to the given stage.
    pub fn enter_stage(&mut self, stage: Stage) -> Result<(), EngineError> {
        self.require_status("enter_stage", &[TaskStatus::Running])?;
        self.modes.set_stage(stage)
    }

    /// Mark the mission's work done (terminal for the active-run detector).
    pub fn complete_mission(&mut self) -> Result<(), EngineError> {
        self.require_status("complete_mission", &[TaskStatus::Running])?;
        self.emit(EventKind::MissionCompleted)?;
        Ok(())
    }

    /// Cancel the mission (user abort).
    pub fn cancel_mission(&mut self, reason: Option<String>) -> Result<(), EngineError> {
        self.require_status("cancel_mission", &[TaskStatus::Running, TaskStatus::Paused])?;
        self.emit(EventKind::MissionCancelled { reason })?;
        Ok(())
    }

    /// Finish the task.
    pub fn finish(&mut self, summary: Option<String>) -> Result<(), EngineError> {
        self.require_status("finish", &[TaskStatus::Running])?;
        self.emit(EventKind::Final { summary })?;
        self.status = TaskStatus::Complete;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.require_status("pause", &[TaskStatus::Running])?;
        self.emit(EventKind::ExecutionPaused)?;
        self.status = TaskStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.require_status("resume", &[TaskStatus::Paused])?;
        self.emit(EventKind::ExecutionResumed)?;
        self.status = TaskStatus::Running;
        Ok(())
    }

    /// Stop the task; in-flight tool calls finish, nothing new starts.
    pub fn stop(&mut self, reason: Option<String>) -> Result<(), EngineError> {
        self.require_status("stop", &[TaskStatus::Running, TaskStatus::Paused])?;
        self.emit(EventKind::ExecutionStopped { reason })?;
        self.status = TaskStatus::Idle;
        Ok(())
    }

    /// Record an interrupted task (host went down mid-run).
    pub fn interrupt(&mut self, reason: Option<String>) -> Result<(), EngineError> {
        self.require_status("interrupt", &[TaskStatus::Running])?;
        self.emit(EventKind::TaskInterrupted { reason })?;
        self.status = TaskStatus::Paused;
        Ok(())
    }

    /// Resume an interrupted task after a crash.
    pub fn recover(&mut self) -> Result<(), EngineError> {
        self.require_status("recover", &[TaskStatus::Paused, TaskStatus::Idle])?;
        self.emit(EventKind::TaskRecoveryStarted)?;
        self.status = TaskStatus::Running;
        Ok(())
    }

    /// Throw the task away after a crash (or on user request).
    pub fn discard(&mut self) -> Result<(), EngineError> {
        self.emit(EventKind::TaskDiscarded)?;
        self.status = TaskStatus::Idle;
        Ok(())
    }

    /// Record a failure and park the task in the error state.
    pub fn report_failure(&mut self, code: &str, message: &str) -> Result<(), EngineError> {
        self.require_status(
            "report_failure",
            &[TaskStatus::Running, TaskStatus::Paused],
        )?;
        self.emit(EventKind::ErrorRaised {
            code: code.to_string(),
            message: message.to_string(),
        })?;
        self.status = TaskStatus::Error;
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
