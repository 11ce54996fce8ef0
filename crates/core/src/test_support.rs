// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::approval::{ApprovalDecision, ApprovalKind, ApprovalScope};
use crate::behavior::Behavior;
use crate::event::{ClarificationOption, DecisionOption, Event, EventKind, RetrievedFile};
use crate::id::{ApprovalId, CheckpointId, EventId, PlanId, SolutionId, TaskId};
use crate::mode::{Mode, Stage};
use crate::plan::{Plan, PlanStep};
use crate::scope::{ImpactLevel, ScopeContract, ScopeExpansion, ToolClass};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Fixed base timestamp used by event factories.
pub const BASE_EPOCH_MS: u64 = 1_767_009_600_000;

/// Build an event with a fixed timestamp and unassigned id.
pub fn event_at(task_id: &str, mode: Mode, stage: Stage, kind: EventKind) -> Event {
    let mut event = Event::new(TaskId::new(task_id), mode, stage, kind);
    event.timestamp = Utc
        .timestamp_millis_opt(BASE_EPOCH_MS as i64)
        .single()
        .unwrap_or_default();
    event
}

/// Same as [`event_at`] but with an explicit event id (for reducer tests
/// that bypass the store).
pub fn event_with_id(
    id: &str,
    task_id: &str,
    mode: Mode,
    stage: Stage,
    kind: EventKind,
) -> Event {
    let mut event = event_at(task_id, mode, stage, kind);
    event.event_id = EventId::new(id);
    event
}

pub fn intent_event(task_id: &str, prompt: &str, behavior: Behavior) -> Event {
    event_at(
        task_id,
        behavior.derived_mode(),
        Stage::None,
        EventKind::IntentReceived {
            prompt: prompt.to_string(),
            behavior,
            confidence: 0.9,
            context_source: None,
            reasoning: String::new(),
        },
    )
}

pub fn plan_with_contract(plan_id: &str, files: &[&str], contract: ScopeContract) -> Plan {
    Plan {
        plan_id: PlanId::new(plan_id),
        title: "plan".to_string(),
        steps: vec![PlanStep::new("step one")],
        scope_contract: Some(contract),
        in_scope_files: files.iter().map(PathBuf::from).collect(),
    }
}

pub fn plan_created_event(task_id: &str, plan_id: &str, files: &[&str]) -> Event {
    let mut contract = ScopeContract::default();
    contract.max_files = files.len().max(1) as u32;
    event_at(
        task_id,
        Mode::Mission,
        Stage::Plan,
        EventKind::PlanCreated {
            plan: plan_with_contract(plan_id, files, contract),
        },
    )
}

pub fn approval_requested_event(task_id: &str, approval_id: &str, kind: ApprovalKind) -> Event {
    event_at(
        task_id,
        Mode::Mission,
        Stage::Edit,
        EventKind::ApprovalRequested {
            approval_id: ApprovalId::new(approval_id),
            kind,
            description: "approve the pending action".to_string(),
            details: json!({}),
            plan_id: None,
        },
    )
}

pub fn approval_resolved_event(
    task_id: &str,
    approval_id: &str,
    decision: ApprovalDecision,
) -> Event {
    event_at(
        task_id,
        Mode::Mission,
        Stage::Edit,
        EventKind::ApprovalResolved {
            approval_id: ApprovalId::new(approval_id),
            decision,
            scope: ApprovalScope::Once,
            modified_details: None,
        },
    )
}

pub fn scope_expansion_resolved_event(task_id: &str, request_id: &str, files: &[&str]) -> Event {
    event_at(
        task_id,
        Mode::Mission,
        Stage::Retrieve,
        EventKind::ScopeExpansionResolved {
            request_id: request_id.to_string(),
            approved: true,
            files: files.iter().map(PathBuf::from).collect(),
            tools: BTreeSet::new(),
            lines: 0,
        },
    )
}

/// One representative of every kind in the vocabulary, for totality tests.
pub fn one_of_each_kind() -> Vec<EventKind> {
    vec![
        EventKind::IntentReceived {
            prompt: "p".into(),
            behavior: Behavior::Answer,
            confidence: 1.0,
            context_source: None,
            reasoning: String::new(),
        },
        EventKind::ClarificationRequested {
            question: "q".into(),
            options: vec![ClarificationOption::new("cancel", "Cancel")],
            attempt: 1,
        },
        EventKind::ClarificationAnswered {
            response: "r".into(),
            attempt: 1,
        },
        EventKind::ModeSet { to: Mode::Answer },
        EventKind::ModeChanged {
            from: Mode::Answer,
            to: Mode::Plan,
        },
        EventKind::StageChanged {
            from: Stage::None,
            to: Stage::Plan,
        },
        EventKind::ModeViolation {
            action: crate::mode::ToolAction::WriteFile,
            message: "m".into(),
        },
        EventKind::ExecutionPaused,
        EventKind::ExecutionResumed,
        EventKind::ExecutionStopped { reason: None },
        EventKind::TaskInterrupted { reason: None },
        EventKind::TaskRecoveryStarted,
        EventKind::TaskDiscarded,
        EventKind::Final { summary: None },
        EventKind::PlanCreated {
            plan: plan_with_contract("plan-1", &["a.rs"], ScopeContract::default()),
        },
        EventKind::PlanRevised {
            plan_id: PlanId::new("plan-2"),
            previous_plan_id: PlanId::new("plan-1"),
        },
        EventKind::PlanSuperseded {
            plan_id: PlanId::new("plan-1"),
        },
        EventKind::PlanLargeDetected {
            plan_id: PlanId::new("plan-1"),
            score: 70,
            reasons: vec![],
        },
        EventKind::MissionStarted { title: None },
        EventKind::MissionCompleted,
        EventKind::MissionCancelled { reason: None },
        EventKind::CommandCompleted {
            command: "c".into(),
            exit_code: 0,
        },
        EventKind::CommandSkipped {
            command: "c".into(),
            reason: None,
        },
        EventKind::RetrievalStarted { query: None },
        EventKind::RetrievalCompleted {
            files: vec![RetrievedFile {
                path: PathBuf::from("a.rs"),
                lines: 10,
                line_range: None,
            }],
            lines_retrieved: 10,
        },
        EventKind::ArtifactProposed {
            artifact_id: "art-1".into(),
            files: vec![],
            summary: None,
        },
        EventKind::DiffApplied {
            files: vec![PathBuf::from("a.rs")],
            lines_added: 1,
            lines_removed: 0,
        },
        EventKind::ToolStart {
            tool: "read_file".into(),
            category: ToolClass::Read,
            inputs: json!({}),
        },
        EventKind::ToolEnd {
            tool: "read_file".into(),
            success: true,
            error: None,
        },
        EventKind::CheckpointCreated {
            checkpoint_id: CheckpointId::new("cp-1"),
            files: vec![],
            description: String::new(),
        },
        EventKind::CheckpointRestored {
            checkpoint_id: CheckpointId::new("cp-1"),
            reason: "denied".into(),
        },
        EventKind::ApprovalRequested {
            approval_id: ApprovalId::new("ap-1"),
            kind: ApprovalKind::ApplyDiff,
            description: String::new(),
            details: json!({}),
            plan_id: None,
        },
        EventKind::ApprovalResolved {
            approval_id: ApprovalId::new("ap-1"),
            decision: ApprovalDecision::Approved,
            scope: ApprovalScope::Once,
            modified_details: None,
        },
        EventKind::ScopeExpansionRequested {
            request_id: "sx-1".into(),
            expansion: ScopeExpansion {
                files: vec![PathBuf::from("b.rs")],
                tools: BTreeSet::new(),
                lines: 0,
                impact_level: ImpactLevel::Low,
                reason: String::new(),
            },
        },
        EventKind::ScopeExpansionResolved {
            request_id: "sx-1".into(),
            approved: true,
            files: vec![PathBuf::from("b.rs")],
            tools: BTreeSet::new(),
            lines: 0,
        },
        EventKind::DecisionPointNeeded {
            decision_id: "dp-1".into(),
            context: String::new(),
            options: vec![DecisionOption::new("Retry")],
            blocking: true,
        },
        EventKind::DecisionPointResolved {
            decision_id: "dp-1".into(),
            chosen: Some(1),
            message: None,
        },
        EventKind::RepairStarted {
            attempt: 1,
            max_attempts: 3,
        },
        EventKind::RepairSucceeded { attempt: 1 },
        EventKind::RepairExhausted { attempts: 3 },
        EventKind::TestRunStarted {
            command: "cargo test".into(),
        },
        EventKind::TestRunCompleted {
            passed: true,
            failures: 0,
        },
        EventKind::TruncatedOutput {
            recovered: true,
            limit_bytes: None,
            tool: None,
        },
        EventKind::MemoryFactsUpdated {
            summary: "s".into(),
        },
        EventKind::SolutionCaptured {
            solution_id: SolutionId::new("sol-1"),
            problem: "p".into(),
        },
        EventKind::GeneratedToolRegistered {
            name: "t".into(),
            sha256: "0".repeat(64),
        },
        EventKind::ProgressUpdated {
            percent: Some(50),
            message: "m".into(),
        },
        EventKind::WarningRaised {
            code: "W".into(),
            message: "m".into(),
        },
        EventKind::ErrorRaised {
            code: "E".into(),
            message: "m".into(),
        },
    ]
}
