// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router context and the active-run detector.

use pilot_core::{Event, EventKind};
use std::collections::HashSet;
use std::path::PathBuf;

/// Everything the router knows beyond the prompt text.
#[derive(Debug, Clone, Default)]
pub struct RouterContext {
    /// Recent events of the current task, oldest first
    pub recent_events: Vec<Event>,
    /// How many clarification rounds have already happened for this prompt
    pub clarification_attempts: u32,
    /// Files touched by the most recent applied diff
    pub last_applied_diff: Option<Vec<PathBuf>>,
    /// File focused in the host editor
    pub last_open_editor: Option<PathBuf>,
    /// Files of the most recently proposed (unapplied) artifact
    pub last_artifact_proposed: Option<Vec<PathBuf>>,
}

/// Whether the event history holds an unresolved blocking interaction newer
/// than the last terminal event.
///
/// An unresolved `approval_requested` or blocking `decision_point_needed`
/// past the most recent terminal marker means the run is still waiting on
/// the user, so a new prompt continues it rather than starting fresh.
/// A long-idle `mission_started` with no approval outstanding does not
/// count; stuck-but-quiet runs route as new prompts.
pub fn has_active_run(events: &[Event]) -> bool {
    let tail_start = events
        .iter()
        .rposition(|e| e.kind().is_some_and(EventKind::is_terminal))
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut open_approvals: HashSet<&str> = HashSet::new();
    let mut open_decisions: HashSet<&str> = HashSet::new();

    for event in &events[tail_start..] {
        match event.kind() {
            Some(EventKind::ApprovalRequested { approval_id, .. }) => {
                open_approvals.insert(approval_id.as_str());
            }
            Some(EventKind::ApprovalResolved { approval_id, .. }) => {
                open_approvals.remove(approval_id.as_str());
            }
            Some(EventKind::DecisionPointNeeded {
                decision_id,
                blocking: true,
                ..
            }) => {
                open_decisions.insert(decision_id.as_str());
            }
            Some(EventKind::DecisionPointResolved { decision_id, .. }) => {
                open_decisions.remove(decision_id.as_str());
            }
            _ => {}
        }
    }

    !open_approvals.is_empty() || !open_decisions.is_empty()
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
