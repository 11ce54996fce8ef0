// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval requests and resolutions for the user gate.

use crate::id::{ApprovalId, PlanId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of side effect is being gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    Terminal,
    ApplyDiff,
    ScopeExpansion,
    PlanApproval,
    GeneratedTool,
    GeneratedToolRun,
}

impl fmt::Display for ApprovalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApprovalKind::Terminal => "terminal",
            ApprovalKind::ApplyDiff => "apply_diff",
            ApprovalKind::ScopeExpansion => "scope_expansion",
            ApprovalKind::PlanApproval => "plan_approval",
            ApprovalKind::GeneratedTool => "generated_tool",
            ApprovalKind::GeneratedToolRun => "generated_tool_run",
        };
        write!(f, "{s}")
    }
}

/// The user's verdict on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Denied,
    EditRequested,
}

/// How far a verdict extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalScope {
    Once,
    Session,
    Always,
}

/// An approval awaiting the user. Held in memory by the approval manager and
/// reconstructable from unresolved `approval_requested` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub approval_id: ApprovalId,
    pub kind: ApprovalKind,
    pub description: String,
    #[serde(default)]
    pub details: serde_json::Value,
    /// Set for `plan_approval` requests; used for idempotency and supersession.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<PlanId>,
    pub requested_at: DateTime<Utc>,
}

/// The outcome delivered back to the blocked caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalResolution {
    pub decision: ApprovalDecision,
    pub scope: ApprovalScope,
    pub resolved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_details: Option<serde_json::Value>,
}

impl ApprovalResolution {
    pub fn is_approved(&self) -> bool {
        self.decision == ApprovalDecision::Approved
    }
}
