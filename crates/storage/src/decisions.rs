// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit store for plan and mode decisions (`state/decisions.json`).

use chrono::{DateTime, Utc};
use pilot_core::{PlanId, TaskId};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

const DECISIONS_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum DecisionStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What kind of decision was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    PlanRefinement,
    PlanApproved,
    PlanRejected,
    ModeSwitch,
}

/// One audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub kind: DecisionKind,
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<PlanId>,
    pub detail: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: u32,
    created_at: DateTime<Utc>,
    decisions: Vec<DecisionRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: DECISIONS_VERSION,
            created_at: Utc::now(),
            decisions: Vec::new(),
        }
    }
}

/// Append-mostly JSON document of decision records.
pub struct DecisionStore {
    path: PathBuf,
}

impl DecisionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append a record, creating the document on first use.
    pub fn append(&self, record: DecisionRecord) -> Result<(), DecisionStoreError> {
        let mut doc = self.load_document()?;
        doc.decisions.push(record);
        self.save_document(&doc)
    }

    /// All recorded decisions, oldest first.
    pub fn all(&self) -> Result<Vec<DecisionRecord>, DecisionStoreError> {
        Ok(self.load_document()?.decisions)
    }

    fn load_document(&self) -> Result<Document, DecisionStoreError> {
        if !self.path.is_file() {
            return Ok(Document::default());
        }
        Ok(serde_json::from_slice(&fs::read(&self.path)?)?)
    }

    fn save_document(&self, doc: &Document) -> Result<(), DecisionStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&serde_json::to_vec_pretty(doc)?)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "decisions_tests.rs"]
mod tests;
