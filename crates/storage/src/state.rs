// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task state projected from event replay.

use pilot_core::{
    Event, EventKind, FileOp, FileOpKind, Mode, Stage, TaskState, TaskStatus, ToolClass,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Materialized task states built by folding events.
///
/// This is the event-sourcing approach where state is derived from events.
/// Events are facts about what happened; state is derived from those facts.
///
/// # Idempotency Requirement
///
/// **All event handlers MUST be idempotent.** Applying the same event twice
/// must produce the same state as applying it once: events can be applied
/// once for immediate visibility and again when they return from log replay.
///
/// Guidelines:
/// - Use assignment (`=`) for status/mode/stage fields
/// - Guard inserts with existence checks
/// - Make additive updates (scope merges, touched files) keyed by event id
///   or membership so re-application is a no-op
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Projection {
    pub tasks: HashMap<String, TaskState>,
}

impl Projection {
    /// Pure fold of an event slice into a projection.
    pub fn reduce(events: &[Event]) -> Self {
        let mut projection = Self::default();
        for event in events {
            projection.apply_event(event);
        }
        projection
    }

    /// Fold only the events of one task into its state.
    ///
    /// Returns the default state (idle, no scope) when the slice holds no
    /// events for the task.
    pub fn reduce_for_task(task_id: &str, events: &[Event]) -> TaskState {
        let mut projection = Self::default();
        for event in events.iter().filter(|e| e.task_id == task_id) {
            projection.apply_event(event);
        }
        projection
            .tasks
            .remove(task_id)
            .unwrap_or_else(|| TaskState::new(task_id.into()))
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskState> {
        self.tasks.get(task_id)
    }

    /// Apply one event. Unknown kinds are ignored (but stay in the log).
    pub fn apply_event(&mut self, event: &Event) {
        let Some(kind) = event.kind() else {
            return;
        };

        let state = self
            .tasks
            .entry(event.task_id.as_str().to_string())
            .or_insert_with(|| TaskState::new(event.task_id.clone()));

        match kind {
            EventKind::IntentReceived { .. } => {
                state.status = TaskStatus::Running;
                state.mode = event.mode;
            }

            EventKind::ModeSet { to } => apply_mode(state, *to),
            EventKind::ModeChanged { to, .. } => apply_mode(state, *to),

            EventKind::StageChanged { to, .. } => {
                // Stages exist only inside MISSION.
                if state.mode == Mode::Mission {
                    state.stage = *to;
                }
            }

            EventKind::ExecutionPaused => state.status = TaskStatus::Paused,
            EventKind::ExecutionResumed => state.status = TaskStatus::Running,
            EventKind::ExecutionStopped { .. } => state.status = TaskStatus::Idle,

            EventKind::TaskInterrupted { .. } => {
                state.status = TaskStatus::Paused;
                state.cleanly_exited = false;
            }

            EventKind::TaskRecoveryStarted => {
                state.status = TaskStatus::Running;
                state.cleanly_exited = true;
            }

            EventKind::TaskDiscarded => {
                state.status = TaskStatus::Idle;
                state.pending_approvals.clear();
                state.active_checkpoint_id = None;
            }

            EventKind::PlanCreated { plan } => {
                if let Some(contract) = &plan.scope_contract {
                    state.budgets = contract.budgets.clone();
                    state.iteration.max = contract.budgets.max_iterations;
                    state.scope_summary.contract = Some(contract.clone());
                }
                state.scope_summary.in_scope_files.clear();
                for file in &plan.in_scope_files {
                    state.scope_summary.in_scope_files.insert(file.clone());
                }
            }

            EventKind::RetrievalCompleted {
                files,
                lines_retrieved,
            } => {
                // Keyed by event id so replaying the same event is a no-op
                let already = state.scope_summary.touched_files.iter().any(|t| {
                    t.ops.iter().any(|op| op.event_id == event.event_id)
                }) && !event.event_id.is_empty();
                if !already {
                    for file in files {
                        state.scope_summary.record_file_op(
                            file.path.clone(),
                            FileOp {
                                op: FileOpKind::Read,
                                timestamp: event.timestamp,
                                event_id: event.event_id.clone(),
                                line_range: file.line_range,
                            },
                        );
                    }
                    state.scope_summary.lines_retrieved += lines_retrieved;
                }
                state.scope_summary.tools_used.insert(ToolClass::Read);
            }

            EventKind::DiffApplied { files, .. } => {
                let already = state.scope_summary.touched_files.iter().any(|t| {
                    t.ops.iter().any(|op| op.event_id == event.event_id)
                }) && !event.event_id.is_empty();
                if !already {
                    for path in files {
                        state.scope_summary.record_file_op(
                            path.clone(),
                            FileOp {
                                op: FileOpKind::Write,
                                timestamp: event.timestamp,
                                event_id: event.event_id.clone(),
                                line_range: None,
                            },
                        );
                    }
                }
                state.scope_summary.tools_used.insert(ToolClass::Write);
            }

            EventKind::ToolStart { category, .. } => {
                state.scope_summary.tools_used.insert(*category);
            }

            EventKind::ScopeExpansionResolved {
                approved,
                files,
                tools,
                lines,
                ..
            } => {
                if *approved {
                    let mut new_files = 0u32;
                    for file in files {
                        if state.scope_summary.in_scope_files.insert(file.clone()) {
                            new_files += 1;
                        }
                    }
                    if let Some(contract) = &mut state.scope_summary.contract {
                        contract.max_files += new_files;
                        contract.max_lines += lines;
                        contract.allowed_tools.extend(tools.iter().copied());
                    }
                }
            }

            EventKind::ApprovalRequested { approval_id, .. } => {
                if !state.pending_approvals.contains(approval_id) {
                    state.pending_approvals.push(approval_id.clone());
                }
            }

            EventKind::ApprovalResolved { approval_id, .. } => {
                state.pending_approvals.retain(|id| id != approval_id);
            }

            EventKind::CheckpointCreated { checkpoint_id, .. } => {
                state.active_checkpoint_id = Some(checkpoint_id.clone());
            }

            EventKind::RepairStarted {
                attempt,
                max_attempts,
            } => {
                state.iteration.current = *attempt;
                state.iteration.max = *max_attempts;
            }

            EventKind::Final { .. } => state.status = TaskStatus::Complete,

            // No projected effect; preserved in the log.
            _ => {}
        }
    }
}

/// Mode updates reset the stage when leaving MISSION and preserve it when
/// staying in MISSION.
fn apply_mode(state: &mut TaskState, to: Mode) {
    if state.mode == Mode::Mission && to != Mode::Mission {
        state.stage = Stage::None;
    }
    state.mode = to;
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
