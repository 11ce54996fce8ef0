// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scope contract enforcement and the expansion flow.

use crate::error::EngineError;
use crate::publish::EventPublisher;
use pilot_core::{
    Event, EventKind, IdGen, ImpactLevel, Mode, ScopeExpansion, ScopeSummary, Stage, TaskId,
    ToolClass, UuidIdGen,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

/// One tool request checked against the contract.
#[derive(Debug, Clone)]
pub struct ScopeRequest {
    pub tool: ToolClass,
    pub files: Vec<PathBuf>,
    /// Lines this request would add to `lines_retrieved`
    pub lines: u64,
}

/// Outcome of a contract check.
#[derive(Debug, Clone)]
pub struct ScopeCheck {
    pub allowed: bool,
    pub reason: Option<String>,
    /// Present when the request could proceed after a user-approved expansion
    pub requires_expansion: Option<ScopeExpansion>,
}

impl ScopeCheck {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            requires_expansion: None,
        }
    }
}

/// Check a request against the projected scope summary.
///
/// A task with no contract yet (nothing planned) is unconstrained; the mode
/// matrix still gates what can run.
pub fn validate_action(summary: &ScopeSummary, request: &ScopeRequest) -> ScopeCheck {
    let Some(contract) = &summary.contract else {
        return ScopeCheck::allowed();
    };

    let mut reasons = Vec::new();
    let mut needed_files: Vec<PathBuf> = Vec::new();
    let mut needed_tools: BTreeSet<ToolClass> = BTreeSet::new();
    let mut needed_lines = 0u64;

    if !contract.allowed_tools.contains(&request.tool) {
        reasons.push(format!("tool class {} not in contract", request.tool));
        needed_tools.insert(request.tool);
    }

    for file in &request.files {
        if !summary.in_scope_files.contains(file) {
            reasons.push(format!("{} not in scope", file.display()));
            needed_files.push(file.clone());
        }
    }

    let projected_lines = summary.lines_retrieved + request.lines;
    if projected_lines > contract.max_lines {
        reasons.push(format!(
            "line budget exceeded: {projected_lines} > {}",
            contract.max_lines
        ));
        needed_lines = projected_lines - contract.max_lines;
    }

    if reasons.is_empty() {
        return ScopeCheck::allowed();
    }

    let impact_level = classify_impact(request, &needed_files, &needed_tools);
    let reason = reasons.join("; ");

    ScopeCheck {
        allowed: false,
        reason: Some(reason.clone()),
        requires_expansion: Some(ScopeExpansion {
            files: needed_files,
            tools: needed_tools,
            lines: needed_lines,
            impact_level,
            reason,
        }),
    }
}

/// Impact classification: read-only single-file additions are low, a new
/// tool class or write escalation is medium, cross-cutting writes are high.
fn classify_impact(
    request: &ScopeRequest,
    needed_files: &[PathBuf],
    needed_tools: &BTreeSet<ToolClass>,
) -> ImpactLevel {
    if request.tool == ToolClass::Write && needed_files.len() > 1 {
        return ImpactLevel::High;
    }
    if !needed_tools.is_empty() {
        return ImpactLevel::Medium;
    }
    if request.tool == ToolClass::Read && needed_files.len() <= 1 {
        return ImpactLevel::Low;
    }
    ImpactLevel::Medium
}

/// Emits scope-expansion request/resolution events.
pub struct ScopeManager<G: IdGen = UuidIdGen> {
    publisher: Arc<dyn EventPublisher>,
    idgen: G,
}

impl ScopeManager<UuidIdGen> {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self::with_idgen(publisher, UuidIdGen)
    }
}

impl<G: IdGen> ScopeManager<G> {
    pub fn with_idgen(publisher: Arc<dyn EventPublisher>, idgen: G) -> Self {
        Self { publisher, idgen }
    }

    /// Publish a `scope_expansion_requested` event; returns the request id.
    pub fn request_expansion(
        &self,
        task_id: TaskId,
        mode: Mode,
        stage: Stage,
        expansion: ScopeExpansion,
    ) -> Result<String, EngineError> {
        let request_id = format!("sx-{}", self.idgen.next());
        self.publisher.publish(Event::new(
            task_id,
            mode,
            stage,
            EventKind::ScopeExpansionRequested {
                request_id: request_id.clone(),
                expansion,
            },
        ))?;
        Ok(request_id)
    }

    /// Publish the user's decision. The reducer merges files/tools/lines
    /// into the contract only when `approved` is true.
    pub fn resolve_expansion(
        &self,
        task_id: TaskId,
        mode: Mode,
        stage: Stage,
        request_id: String,
        approved: bool,
        expansion: &ScopeExpansion,
    ) -> Result<(), EngineError> {
        self.publisher.publish(Event::new(
            task_id,
            mode,
            stage,
            EventKind::ScopeExpansionResolved {
                request_id,
                approved,
                files: expansion.files.clone(),
                tools: expansion.tools.clone(),
                lines: expansion.lines,
            },
        ))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
