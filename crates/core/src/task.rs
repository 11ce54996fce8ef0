// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task state: the projection of one task's event history.

use crate::id::{ApprovalId, CheckpointId, TaskId};
use crate::mode::{Mode, Stage};
use crate::scope::{Budgets, ScopeSummary};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Idle,
    Running,
    Paused,
    Error,
    Complete,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Idle
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Idle => "idle",
            TaskStatus::Running => "running",
            TaskStatus::Paused => "paused",
            TaskStatus::Error => "error",
            TaskStatus::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Repair-loop iteration counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iteration {
    pub current: u32,
    pub max: u32,
}

impl Default for Iteration {
    fn default() -> Self {
        Self { current: 0, max: 3 }
    }
}

/// Snapshot of a task, always reducible from its events and never the
/// source of truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub task_id: TaskId,
    pub mode: Mode,
    pub stage: Stage,
    pub status: TaskStatus,
    #[serde(default)]
    pub iteration: Iteration,
    #[serde(default)]
    pub budgets: Budgets,
    /// Approval ids requested but not yet resolved, in request order.
    #[serde(default)]
    pub pending_approvals: Vec<ApprovalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_checkpoint_id: Option<CheckpointId>,
    #[serde(default)]
    pub scope_summary: ScopeSummary,
    /// Cleared when the task is interrupted; used for crash detection.
    #[serde(default = "default_true")]
    pub cleanly_exited: bool,
}

fn default_true() -> bool {
    true
}

impl TaskState {
    pub fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            cleanly_exited: true,
            ..Self::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status == TaskStatus::Complete
    }
}
