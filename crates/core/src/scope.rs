// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scope contracts: per-task bounds on files, lines, and tool classes.

use crate::id::EventId;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Coarse tool category a contract may allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolClass {
    Read,
    Exec,
    Write,
}

impl fmt::Display for ToolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolClass::Read => write!(f, "read"),
            ToolClass::Exec => write!(f, "exec"),
            ToolClass::Write => write!(f, "write"),
        }
    }
}

/// Execution budgets attached to a scope contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budgets {
    pub max_iterations: u32,
    pub max_tool_calls: u32,
    pub max_time_ms: u64,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            max_tool_calls: 50,
            max_time_ms: 10 * 60 * 1000,
        }
    }
}

/// Bounds a task agrees to stay within.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeContract {
    pub max_files: u32,
    pub max_lines: u64,
    pub allowed_tools: BTreeSet<ToolClass>,
    #[serde(default)]
    pub budgets: Budgets,
}

impl Default for ScopeContract {
    fn default() -> Self {
        Self {
            max_files: 1,
            max_lines: 500,
            allowed_tools: BTreeSet::from([ToolClass::Read]),
            budgets: Budgets::default(),
        }
    }
}

/// One operation recorded against a touched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOpKind {
    Read,
    Write,
    Execute,
}

/// Append-only record of a single file access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOp {
    pub op: FileOpKind,
    pub timestamp: DateTime<Utc>,
    pub event_id: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<(u64, u64)>,
}

/// A file the task has touched, with its ordered access history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchedFile {
    pub path: PathBuf,
    pub ops: Vec<FileOp>,
}

/// Projection of the scope a task actually consumed against its contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<ScopeContract>,
    #[serde(default)]
    pub in_scope_files: IndexSet<PathBuf>,
    #[serde(default)]
    pub touched_files: Vec<TouchedFile>,
    #[serde(default)]
    pub lines_retrieved: u64,
    #[serde(default)]
    pub tools_used: BTreeSet<ToolClass>,
}

impl ScopeSummary {
    /// Record an access to `path`, appending to the existing entry if one exists.
    pub fn record_file_op(&mut self, path: PathBuf, op: FileOp) {
        if let Some(entry) = self.touched_files.iter_mut().find(|t| t.path == path) {
            entry.ops.push(op);
        } else {
            self.touched_files.push(TouchedFile {
                path,
                ops: vec![op],
            });
        }
    }
}

/// How disruptive a requested expansion is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

/// A request to widen the contract, pending user approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeExpansion {
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub tools: BTreeSet<ToolClass>,
    #[serde(default)]
    pub lines: u64,
    pub impact_level: ImpactLevel,
    pub reason: String,
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
