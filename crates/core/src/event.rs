// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical event vocabulary.
//!
//! Every event is an envelope (`event_id`, `task_id`, `timestamp`, `mode`,
//! `stage`, causal links) around a tagged payload. Serializes with
//! `{"type": "event_name", ...fields}` inlined into the envelope. Unknown
//! type tags deserialize to [`UnknownEvent`] so foreign log lines survive a
//! read/normalize round trip, but the store rejects them at append.

use crate::approval::{ApprovalDecision, ApprovalKind, ApprovalScope};
use crate::behavior::Behavior;
use crate::id::{ApprovalId, CheckpointId, EventId, EvidenceId, PlanId, SolutionId, TaskId};
use crate::mode::{Mode, Stage, ToolAction};
use crate::plan::Plan;
use crate::scope::{ScopeExpansion, ToolClass};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// One action offered with a clarification question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationOption {
    /// Machine action: `provide_file`, `provide_scope`, `confirm_intent`, `cancel`
    pub action: String,
    pub label: String,
}

impl ClarificationOption {
    pub fn new(action: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            label: label.into(),
        }
    }
}

/// One option the user can choose at a decision point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub recommended: bool,
}

impl DecisionOption {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
            recommended: false,
        }
    }

    pub fn description(mut self, d: impl Into<String>) -> Self {
        self.description = Some(d.into());
        self
    }

    pub fn recommended(mut self) -> Self {
        self.recommended = true;
        self
    }
}

/// A file (or slice of one) returned by retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedFile {
    pub path: PathBuf,
    pub lines: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<(u64, u64)>,
}

/// Payloads of the closed event vocabulary.
///
/// Wire names are the `type` tag values; payload fields sit beside the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    // -- intent / routing --
    #[serde(rename = "intent_received")]
    IntentReceived {
        prompt: String,
        behavior: Behavior,
        confidence: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context_source: Option<String>,
        #[serde(default)]
        reasoning: String,
    },

    #[serde(rename = "clarification_requested")]
    ClarificationRequested {
        question: String,
        options: Vec<ClarificationOption>,
        attempt: u32,
    },

    #[serde(rename = "clarification_answered")]
    ClarificationAnswered { response: String, attempt: u32 },

    // -- mode / stage --
    #[serde(rename = "mode_set")]
    ModeSet { to: Mode },

    #[serde(rename = "mode_changed")]
    ModeChanged { from: Mode, to: Mode },

    #[serde(rename = "stage_changed")]
    StageChanged { from: Stage, to: Stage },

    #[serde(rename = "mode_violation")]
    ModeViolation { action: ToolAction, message: String },

    // -- execution status --
    #[serde(rename = "execution_paused")]
    ExecutionPaused,

    #[serde(rename = "execution_resumed")]
    ExecutionResumed,

    #[serde(rename = "execution_stopped")]
    ExecutionStopped {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    #[serde(rename = "task_interrupted")]
    TaskInterrupted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    #[serde(rename = "task_recovery_started")]
    TaskRecoveryStarted,

    #[serde(rename = "task_discarded")]
    TaskDiscarded,

    #[serde(rename = "final")]
    Final {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },

    // -- plan --
    #[serde(rename = "plan_created")]
    PlanCreated { plan: Plan },

    #[serde(rename = "plan_revised")]
    PlanRevised {
        plan_id: PlanId,
        previous_plan_id: PlanId,
    },

    #[serde(rename = "plan_superseded")]
    PlanSuperseded { plan_id: PlanId },

    #[serde(rename = "plan_large_detected")]
    PlanLargeDetected {
        plan_id: PlanId,
        score: u32,
        reasons: Vec<String>,
    },

    // -- mission / command --
    #[serde(rename = "mission_started")]
    MissionStarted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    #[serde(rename = "mission_completed")]
    MissionCompleted,

    #[serde(rename = "mission_cancelled")]
    MissionCancelled {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    #[serde(rename = "command_completed")]
    CommandCompleted { command: String, exit_code: i32 },

    #[serde(rename = "command_skipped")]
    CommandSkipped {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    // -- retrieval / edit --
    #[serde(rename = "retrieval_started")]
    RetrievalStarted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query: Option<String>,
    },

    #[serde(rename = "retrieval_completed")]
    RetrievalCompleted {
        files: Vec<RetrievedFile>,
        lines_retrieved: u64,
    },

    #[serde(rename = "artifact_proposed")]
    ArtifactProposed {
        artifact_id: String,
        files: Vec<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },

    #[serde(rename = "diff_applied")]
    DiffApplied {
        files: Vec<PathBuf>,
        #[serde(default)]
        lines_added: u64,
        #[serde(default)]
        lines_removed: u64,
    },

    // -- tools --
    #[serde(rename = "tool_start")]
    ToolStart {
        tool: String,
        category: ToolClass,
        /// Redacted inputs; sensitive keys are replaced before emission.
        #[serde(default)]
        inputs: serde_json::Value,
    },

    #[serde(rename = "tool_end")]
    ToolEnd {
        tool: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    // -- checkpoints --
    #[serde(rename = "checkpoint_created")]
    CheckpointCreated {
        checkpoint_id: CheckpointId,
        files: Vec<PathBuf>,
        #[serde(default)]
        description: String,
    },

    #[serde(rename = "checkpoint_restored")]
    CheckpointRestored {
        checkpoint_id: CheckpointId,
        reason: String,
    },

    // -- approvals --
    #[serde(rename = "approval_requested")]
    ApprovalRequested {
        approval_id: ApprovalId,
        kind: ApprovalKind,
        description: String,
        #[serde(default)]
        details: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plan_id: Option<PlanId>,
    },

    #[serde(rename = "approval_resolved")]
    ApprovalResolved {
        approval_id: ApprovalId,
        decision: ApprovalDecision,
        scope: ApprovalScope,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        modified_details: Option<serde_json::Value>,
    },

    // -- scope --
    #[serde(rename = "scope_expansion_requested")]
    ScopeExpansionRequested {
        request_id: String,
        expansion: ScopeExpansion,
    },

    #[serde(rename = "scope_expansion_resolved")]
    ScopeExpansionResolved {
        request_id: String,
        approved: bool,
        #[serde(default)]
        files: Vec<PathBuf>,
        #[serde(default)]
        tools: BTreeSet<ToolClass>,
        #[serde(default)]
        lines: u64,
    },

    // -- decision points --
    #[serde(rename = "decision_point_needed")]
    DecisionPointNeeded {
        decision_id: String,
        context: String,
        options: Vec<DecisionOption>,
        #[serde(default)]
        blocking: bool,
    },

    #[serde(rename = "decision_point_resolved")]
    DecisionPointResolved {
        decision_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chosen: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    // -- repair / test --
    #[serde(rename = "repair_started")]
    RepairStarted { attempt: u32, max_attempts: u32 },

    #[serde(rename = "repair_succeeded")]
    RepairSucceeded { attempt: u32 },

    #[serde(rename = "repair_exhausted")]
    RepairExhausted { attempts: u32 },

    #[serde(rename = "test_run_started")]
    TestRunStarted { command: String },

    #[serde(rename = "test_run_completed")]
    TestRunCompleted { passed: bool, failures: u32 },

    // -- transport --
    #[serde(rename = "truncated_output")]
    TruncatedOutput {
        recovered: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit_bytes: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
    },

    // -- memory --
    #[serde(rename = "memory_facts_updated")]
    MemoryFactsUpdated { summary: String },

    #[serde(rename = "solution_captured")]
    SolutionCaptured {
        solution_id: SolutionId,
        problem: String,
    },

    // -- generated tools --
    #[serde(rename = "generated_tool_registered")]
    GeneratedToolRegistered { name: String, sha256: String },

    // -- progress / diagnostics --
    #[serde(rename = "progress_updated")]
    ProgressUpdated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        percent: Option<u8>,
        message: String,
    },

    #[serde(rename = "warning_raised")]
    WarningRaised { code: String, message: String },

    #[serde(rename = "error_raised")]
    ErrorRaised { code: String, message: String },
}

impl EventKind {
    /// Wire name of this kind (the serde `type` tag).
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::IntentReceived { .. } => "intent_received",
            EventKind::ClarificationRequested { .. } => "clarification_requested",
            EventKind::ClarificationAnswered { .. } => "clarification_answered",
            EventKind::ModeSet { .. } => "mode_set",
            EventKind::ModeChanged { .. } => "mode_changed",
            EventKind::StageChanged { .. } => "stage_changed",
            EventKind::ModeViolation { .. } => "mode_violation",
            EventKind::ExecutionPaused => "execution_paused",
            EventKind::ExecutionResumed => "execution_resumed",
            EventKind::ExecutionStopped { .. } => "execution_stopped",
            EventKind::TaskInterrupted { .. } => "task_interrupted",
            EventKind::TaskRecoveryStarted => "task_recovery_started",
            EventKind::TaskDiscarded => "task_discarded",
            EventKind::Final { .. } => "final",
            EventKind::PlanCreated { .. } => "plan_created",
            EventKind::PlanRevised { .. } => "plan_revised",
            EventKind::PlanSuperseded { .. } => "plan_superseded",
            EventKind::PlanLargeDetected { .. } => "plan_large_detected",
            EventKind::MissionStarted { .. } => "mission_started",
            EventKind::MissionCompleted => "mission_completed",
            EventKind::MissionCancelled { .. } => "mission_cancelled",
            EventKind::CommandCompleted { .. } => "command_completed",
            EventKind::CommandSkipped { .. } => "command_skipped",
            EventKind::RetrievalStarted { .. } => "retrieval_started",
            EventKind::RetrievalCompleted { .. } => "retrieval_completed",
            EventKind::ArtifactProposed { .. } => "artifact_proposed",
            EventKind::DiffApplied { .. } => "diff_applied",
            EventKind::ToolStart { .. } => "tool_start",
            EventKind::ToolEnd { .. } => "tool_end",
            EventKind::CheckpointCreated { .. } => "checkpoint_created",
            EventKind::CheckpointRestored { .. } => "checkpoint_restored",
            EventKind::ApprovalRequested { .. } => "approval_requested",
            EventKind::ApprovalResolved { .. } => "approval_resolved",
            EventKind::ScopeExpansionRequested { .. } => "scope_expansion_requested",
            EventKind::ScopeExpansionResolved { .. } => "scope_expansion_resolved",
            EventKind::DecisionPointNeeded { .. } => "decision_point_needed",
            EventKind::DecisionPointResolved { .. } => "decision_point_resolved",
            EventKind::RepairStarted { .. } => "repair_started",
            EventKind::RepairSucceeded { .. } => "repair_succeeded",
            EventKind::RepairExhausted { .. } => "repair_exhausted",
            EventKind::TestRunStarted { .. } => "test_run_started",
            EventKind::TestRunCompleted { .. } => "test_run_completed",
            EventKind::TruncatedOutput { .. } => "truncated_output",
            EventKind::MemoryFactsUpdated { .. } => "memory_facts_updated",
            EventKind::SolutionCaptured { .. } => "solution_captured",
            EventKind::GeneratedToolRegistered { .. } => "generated_tool_registered",
            EventKind::ProgressUpdated { .. } => "progress_updated",
            EventKind::WarningRaised { .. } => "warning_raised",
            EventKind::ErrorRaised { .. } => "error_raised",
        }
    }

    /// Terminal markers used by the active-run detector: anything past one of
    /// these no longer blocks a new prompt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventKind::Final { .. }
                | EventKind::MissionCompleted
                | EventKind::MissionCancelled { .. }
                | EventKind::CommandCompleted { .. }
                | EventKind::CommandSkipped { .. }
        )
    }
}

/// A raw event whose type tag is outside the vocabulary.
///
/// Preserved verbatim so reads and normalization never drop a log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Known payload or preserved-unknown fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventBody {
    Known(EventKind),
    Unknown(UnknownEvent),
}

/// The canonical persistent record. Everything else is a projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub event_id: EventId,
    pub task_id: TaskId,
    pub timestamp: DateTime<Utc>,
    pub mode: Mode,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_ids: Vec<EvidenceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<EventId>,
    #[serde(flatten)]
    pub body: EventBody,
}

impl Event {
    /// Build an event with an unassigned id; the store assigns ids at append.
    pub fn new(task_id: TaskId, mode: Mode, stage: Stage, kind: EventKind) -> Self {
        Self {
            event_id: EventId::default(),
            task_id,
            timestamp: Utc::now(),
            mode,
            stage,
            evidence_ids: Vec::new(),
            parent_event_id: None,
            body: EventBody::Known(kind),
        }
    }

    pub fn with_parent(mut self, parent: EventId) -> Self {
        self.parent_event_id = Some(parent);
        self
    }

    pub fn with_evidence(mut self, ids: Vec<EvidenceId>) -> Self {
        self.evidence_ids = ids;
        self
    }

    /// The known payload, or `None` for a preserved-unknown record.
    pub fn kind(&self) -> Option<&EventKind> {
        match &self.body {
            EventBody::Known(kind) => Some(kind),
            EventBody::Unknown(_) => None,
        }
    }

    /// The raw type tag, whether or not the kind is in the vocabulary.
    pub fn type_name(&self) -> &str {
        match &self.body {
            EventBody::Known(kind) => kind.name(),
            EventBody::Unknown(raw) => &raw.kind,
        }
    }

    /// One-line summary for log spans.
    pub fn log_summary(&self) -> String {
        format!(
            "{} task={} mode={} stage={}",
            self.type_name(),
            self.task_id.short(8),
            self.mode,
            self.stage
        )
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
