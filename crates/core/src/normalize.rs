// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-time projection of the raw event vocabulary onto stable primitives.
//!
//! The raw vocabulary grows; UI consumers key off a small closed set of
//! primitive types instead. The mapping is total: every raw event projects
//! to exactly one primitive, anything outside the vocabulary lands on
//! `unknown_event`, and no raw event is ever dropped. Normalized views are
//! computed on demand and never stored.

use crate::event::{Event, EventBody, EventKind};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Version stamped on every normalized view so UI caches can invalidate.
pub const NORMALIZER_VERSION: u32 = 2;

/// The closed set of primitive event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveEventType {
    RunStarted,
    RunCompleted,
    StepStarted,
    StepCompleted,
    ToolStarted,
    ToolCompleted,
    ArtifactProposed,
    ArtifactApplied,
    DecisionPointNeeded,
    UserActionTaken,
    ProgressUpdated,
    StateChanged,
    WarningRaised,
    ErrorRaised,
    UnknownEvent,
}

/// Which layer of the run an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventScope {
    Run,
    Mission,
    Step,
    Tool,
    Ui,
}

/// The stable view of one raw event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedView {
    #[serde(rename = "type")]
    pub primitive: PrimitiveEventType,
    /// The raw type tag that produced this view.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub scope: EventScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_hint: Option<String>,
}

/// A raw event paired with its normalized view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub raw: Event,
    pub normalized: NormalizedView,
    pub normalizer_version: u32,
}

struct ViewBuilder {
    view: NormalizedView,
}

impl ViewBuilder {
    fn new(primitive: PrimitiveEventType, kind: &str, scope: EventScope) -> Self {
        Self {
            view: NormalizedView {
                primitive,
                kind: kind.to_string(),
                code: None,
                scope,
                from: None,
                to: None,
                details: serde_json::Value::Null,
                ui_hint: None,
            },
        }
    }

    fn code(mut self, code: &str) -> Self {
        self.view.code = Some(code.to_string());
        self
    }

    fn transition(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.view.from = from;
        self.view.to = to;
        self
    }

    fn details(mut self, details: serde_json::Value) -> Self {
        self.view.details = details;
        self
    }

    fn ui_hint(mut self, hint: &str) -> Self {
        self.view.ui_hint = Some(hint.to_string());
        self
    }

    fn build(self) -> NormalizedView {
        self.view
    }
}

/// Project one raw event onto its stable primitive view.
pub fn normalize(event: &Event) -> NormalizedEvent {
    let normalized = match &event.body {
        EventBody::Known(kind) => normalize_known(kind),
        EventBody::Unknown(raw) => ViewBuilder::new(
            PrimitiveEventType::UnknownEvent,
            &raw.kind,
            EventScope::Run,
        )
        .details(serde_json::Value::Object(raw.payload.clone()))
        .build(),
    };

    NormalizedEvent {
        raw: event.clone(),
        normalized,
        normalizer_version: NORMALIZER_VERSION,
    }
}

/// Normalize a slice, preserving order.
pub fn normalize_batch(events: &[Event]) -> Vec<NormalizedEvent> {
    events.iter().map(normalize).collect()
}

fn normalize_known(kind: &EventKind) -> NormalizedView {
    use EventScope as S;
    use PrimitiveEventType as P;

    let name = kind.name();
    match kind {
        EventKind::IntentReceived {
            behavior,
            confidence,
            ..
        } => ViewBuilder::new(P::RunStarted, name, S::Run)
            .details(json!({ "behavior": behavior, "confidence": confidence }))
            .build(),

        EventKind::ClarificationRequested {
            question, options, ..
        } => ViewBuilder::new(P::DecisionPointNeeded, name, S::Ui)
            .details(json!({ "question": question, "options": options.len() }))
            .ui_hint("clarify")
            .build(),

        EventKind::ClarificationAnswered { attempt, .. } => {
            ViewBuilder::new(P::UserActionTaken, name, S::Ui)
                .details(json!({ "attempt": attempt }))
                .build()
        }

        EventKind::ModeSet { to } => ViewBuilder::new(P::StateChanged, name, S::Run)
            .transition(None, Some(to.to_string()))
            .build(),

        EventKind::ModeChanged { from, to } => ViewBuilder::new(P::StateChanged, name, S::Run)
            .transition(Some(from.to_string()), Some(to.to_string()))
            .build(),

        EventKind::StageChanged { from, to } => {
            ViewBuilder::new(P::StateChanged, name, S::Mission)
                .transition(Some(from.to_string()), Some(to.to_string()))
                .build()
        }

        EventKind::ModeViolation { action, message } => {
            ViewBuilder::new(P::ErrorRaised, name, S::Run)
                .code("MODE_VIOLATION")
                .details(json!({ "action": action, "message": message }))
                .build()
        }

        EventKind::ExecutionPaused => ViewBuilder::new(P::StateChanged, name, S::Run)
            .transition(Some("running".into()), Some("paused".into()))
            .build(),

        EventKind::ExecutionResumed => ViewBuilder::new(P::StateChanged, name, S::Run)
            .transition(Some("paused".into()), Some("running".into()))
            .build(),

        EventKind::ExecutionStopped { reason } => ViewBuilder::new(P::StateChanged, name, S::Run)
            .transition(Some("running".into()), Some("idle".into()))
            .details(json!({ "reason": reason }))
            .build(),

        EventKind::TaskInterrupted { reason } => ViewBuilder::new(P::WarningRaised, name, S::Run)
            .code("TASK_INTERRUPTED")
            .details(json!({ "reason": reason }))
            .build(),

        EventKind::TaskRecoveryStarted => ViewBuilder::new(P::StateChanged, name, S::Run)
            .transition(Some("paused".into()), Some("running".into()))
            .build(),

        EventKind::TaskDiscarded => ViewBuilder::new(P::StateChanged, name, S::Run)
            .transition(None, Some("idle".into()))
            .build(),

        EventKind::Final { summary } => ViewBuilder::new(P::RunCompleted, name, S::Run)
            .details(json!({ "summary": summary }))
            .build(),

        EventKind::PlanCreated { plan } => ViewBuilder::new(P::ArtifactProposed, name, S::Run)
            .details(json!({ "plan_id": plan.plan_id, "steps": plan.steps.len() }))
            .ui_hint("plan")
            .build(),

        EventKind::PlanRevised {
            plan_id,
            previous_plan_id,
        } => ViewBuilder::new(P::ArtifactProposed, name, S::Run)
            .details(json!({ "plan_id": plan_id, "previous_plan_id": previous_plan_id }))
            .ui_hint("plan")
            .build(),

        EventKind::PlanSuperseded { plan_id } => ViewBuilder::new(P::StateChanged, name, S::Run)
            .details(json!({ "plan_id": plan_id }))
            .build(),

        EventKind::PlanLargeDetected {
            plan_id,
            score,
            reasons,
        } => ViewBuilder::new(P::WarningRaised, name, S::Run)
            .code("PLAN_LARGE")
            .details(json!({ "plan_id": plan_id, "score": score, "reasons": reasons }))
            .build(),

        EventKind::MissionStarted { title } => ViewBuilder::new(P::RunStarted, name, S::Mission)
            .details(json!({ "title": title }))
            .build(),

        EventKind::MissionCompleted => {
            ViewBuilder::new(P::RunCompleted, name, S::Mission).build()
        }

        EventKind::MissionCancelled { reason } => {
            ViewBuilder::new(P::RunCompleted, name, S::Mission)
                .code("CANCELLED")
                .details(json!({ "reason": reason }))
                .build()
        }

        EventKind::CommandCompleted { command, exit_code } => {
            ViewBuilder::new(P::StepCompleted, name, S::Step)
                .details(json!({ "command": command, "exit_code": exit_code }))
                .build()
        }

        EventKind::CommandSkipped { command, reason } => {
            ViewBuilder::new(P::StepCompleted, name, S::Step)
                .code("SKIPPED")
                .details(json!({ "command": command, "reason": reason }))
                .build()
        }

        EventKind::RetrievalStarted { query } => ViewBuilder::new(P::StepStarted, name, S::Step)
            .details(json!({ "query": query }))
            .build(),

        EventKind::RetrievalCompleted {
            files,
            lines_retrieved,
        } => ViewBuilder::new(P::StepCompleted, name, S::Step)
            .details(json!({ "files": files.len(), "lines_retrieved": lines_retrieved }))
            .build(),

        EventKind::ArtifactProposed {
            artifact_id, files, ..
        } => ViewBuilder::new(P::ArtifactProposed, name, S::Step)
            .details(json!({ "artifact_id": artifact_id, "files": files.len() }))
            .build(),

        EventKind::DiffApplied {
            files,
            lines_added,
            lines_removed,
        } => ViewBuilder::new(P::ArtifactApplied, name, S::Step)
            .details(json!({
                "files": files.len(),
                "lines_added": lines_added,
                "lines_removed": lines_removed,
            }))
            .build(),

        EventKind::ToolStart { tool, category, .. } => {
            ViewBuilder::new(P::ToolStarted, name, S::Tool)
                .details(json!({ "tool": tool, "category": category }))
                .build()
        }

        EventKind::ToolEnd {
            tool,
            success,
            error,
        } => {
            let b = ViewBuilder::new(P::ToolCompleted, name, S::Tool)
                .details(json!({ "tool": tool, "success": success, "error": error }));
            if *success {
                b.build()
            } else {
                b.code("TOOL_FAILED").build()
            }
        }

        EventKind::CheckpointCreated {
            checkpoint_id,
            files,
            ..
        } => ViewBuilder::new(P::ProgressUpdated, name, S::Run)
            .details(json!({ "checkpoint_id": checkpoint_id, "files": files.len() }))
            .ui_hint("checkpoint")
            .build(),

        EventKind::CheckpointRestored {
            checkpoint_id,
            reason,
        } => ViewBuilder::new(P::WarningRaised, name, S::Run)
            .code("CHECKPOINT_RESTORED")
            .details(json!({ "checkpoint_id": checkpoint_id, "reason": reason }))
            .build(),

        EventKind::ApprovalRequested {
            approval_id,
            kind,
            description,
            ..
        } => ViewBuilder::new(P::DecisionPointNeeded, name, S::Ui)
            .details(json!({
                "approval_id": approval_id,
                "kind": kind,
                "description": description,
            }))
            .ui_hint("approval")
            .build(),

        EventKind::ApprovalResolved {
            approval_id,
            decision,
            ..
        } => ViewBuilder::new(P::UserActionTaken, name, S::Ui)
            .details(json!({ "approval_id": approval_id, "decision": decision }))
            .build(),

        EventKind::ScopeExpansionRequested {
            request_id,
            expansion,
        } => ViewBuilder::new(P::DecisionPointNeeded, name, S::Ui)
            .code("SCOPE_EXPANSION")
            .details(json!({
                "request_id": request_id,
                "impact_level": expansion.impact_level,
                "files": expansion.files.len(),
            }))
            .build(),

        EventKind::ScopeExpansionResolved {
            request_id,
            approved,
            ..
        } => ViewBuilder::new(P::UserActionTaken, name, S::Ui)
            .details(json!({ "request_id": request_id, "approved": approved }))
            .build(),

        EventKind::DecisionPointNeeded {
            decision_id,
            context,
            blocking,
            ..
        } => ViewBuilder::new(P::DecisionPointNeeded, name, S::Ui)
            .details(json!({
                "decision_id": decision_id,
                "context": context,
                "blocking": blocking,
            }))
            .build(),

        EventKind::DecisionPointResolved {
            decision_id,
            chosen,
            ..
        } => ViewBuilder::new(P::UserActionTaken, name, S::Ui)
            .details(json!({ "decision_id": decision_id, "chosen": chosen }))
            .build(),

        EventKind::RepairStarted {
            attempt,
            max_attempts,
        } => ViewBuilder::new(P::StepStarted, name, S::Step)
            .details(json!({ "attempt": attempt, "max_attempts": max_attempts }))
            .build(),

        EventKind::RepairSucceeded { attempt } => {
            ViewBuilder::new(P::StepCompleted, name, S::Step)
                .details(json!({ "attempt": attempt }))
                .build()
        }

        EventKind::RepairExhausted { attempts } => ViewBuilder::new(P::ErrorRaised, name, S::Step)
            .code("REPAIR_EXHAUSTED")
            .details(json!({ "attempts": attempts }))
            .build(),

        EventKind::TestRunStarted { command } => ViewBuilder::new(P::StepStarted, name, S::Step)
            .details(json!({ "command": command }))
            .build(),

        EventKind::TestRunCompleted { passed, failures } => {
            let b = ViewBuilder::new(P::StepCompleted, name, S::Step)
                .details(json!({ "passed": passed, "failures": failures }));
            if *passed {
                b.build()
            } else {
                b.code("TESTS_FAILED").build()
            }
        }

        EventKind::TruncatedOutput {
            recovered,
            limit_bytes,
            tool,
        } => {
            let details = json!({ "limit_bytes": limit_bytes, "tool": tool });
            if *recovered {
                ViewBuilder::new(P::WarningRaised, name, S::Tool)
                    .code("TRUNCATED_OUTPUT_RECOVERED")
                    .details(details)
                    .build()
            } else {
                ViewBuilder::new(P::ErrorRaised, name, S::Tool)
                    .code("TRUNCATED_OUTPUT_FATAL")
                    .details(details)
                    .build()
            }
        }

        EventKind::MemoryFactsUpdated { summary } => {
            ViewBuilder::new(P::ProgressUpdated, name, S::Run)
                .details(json!({ "summary": summary }))
                .build()
        }

        EventKind::SolutionCaptured {
            solution_id,
            problem,
        } => ViewBuilder::new(P::ProgressUpdated, name, S::Run)
            .details(json!({ "solution_id": solution_id, "problem": problem }))
            .build(),

        EventKind::GeneratedToolRegistered { name: tool_name, sha256 } => {
            ViewBuilder::new(P::ArtifactApplied, name, S::Run)
                .details(json!({ "name": tool_name, "sha256": sha256 }))
                .build()
        }

        EventKind::ProgressUpdated { percent, message } => {
            ViewBuilder::new(P::ProgressUpdated, name, S::Run)
                .details(json!({ "percent": percent, "message": message }))
                .build()
        }

        EventKind::WarningRaised { code, message } => {
            ViewBuilder::new(P::WarningRaised, name, S::Run)
                .code(code)
                .details(json!({ "message": message }))
                .build()
        }

        EventKind::ErrorRaised { code, message } => ViewBuilder::new(P::ErrorRaised, name, S::Run)
            .code(code)
            .details(json!({ "message": message }))
            .build(),
    }
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
