// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan structures produced during the planning phase.

use crate::id::PlanId;
use crate::scope::ScopeContract;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One step of a generated plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Files this step is expected to touch, when known up front.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
}

impl PlanStep {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            files: Vec::new(),
        }
    }
}

/// A generated plan with its scope contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: PlanId,
    pub title: String,
    pub steps: Vec<PlanStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_contract: Option<ScopeContract>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub in_scope_files: Vec<PathBuf>,
}

/// Optional model-provided estimates attached to a plan.
///
/// These can only widen the size assessment, never shrink it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_files_touched: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_dev_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risk_areas: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}
