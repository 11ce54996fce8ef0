// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memory persistence: the facts document and captured solutions.
//!
//! Facts accumulate in `memory/MEMORY.md` with stable `[mem-N]` markers and
//! a metadata sidecar tracking the id counter and reference counts.
//! Solutions live one-per-file under `memory/solutions/` with a rebuildable
//! `index.json`. Relevance scoring happens upstream; this module only
//! persists.

use chrono::{DateTime, Utc};
use pilot_core::{SolutionId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("solution not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoryMetadata {
    next_id: u64,
    #[serde(default)]
    reference_counts: HashMap<String, u64>,
}

/// Result of appending facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactsUpdate {
    /// Ids assigned to the appended lines (`mem-N`)
    pub fact_ids: Vec<String>,
    /// First appended line, truncated to 80 characters
    pub summary: String,
}

/// Store for the structured facts document.
pub struct MemoryStore {
    root: PathBuf,
}

impl MemoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn facts_path(&self) -> PathBuf {
        self.root.join("MEMORY.md")
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join("memory-metadata.json")
    }

    /// Append fact lines with fresh id markers.
    ///
    /// Blank lines are skipped. The returned summary is the first appended
    /// line truncated to 80 characters.
    pub fn append_facts(&self, lines: &[String]) -> Result<FactsUpdate, MemoryStoreError> {
        fs::create_dir_all(&self.root)?;

        let mut metadata = self.load_metadata()?;
        let mut fact_ids = Vec::new();
        let mut body = String::new();

        for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
            metadata.next_id += 1;
            let id = format!("mem-{}", metadata.next_id);
            body.push_str(&format!("- [{id}] {line}\n"));
            fact_ids.push(id);
        }

        if !fact_ids.is_empty() {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.facts_path())?;
            file.write_all(body.as_bytes())?;
            file.sync_all()?;
            self.save_metadata(&metadata)?;
        }

        let summary = lines
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .unwrap_or("")
            .chars()
            .take(80)
            .collect();

        Ok(FactsUpdate { fact_ids, summary })
    }

    /// Full facts document, empty string when none exists yet.
    pub fn read_facts(&self) -> Result<String, MemoryStoreError> {
        if !self.facts_path().is_file() {
            return Ok(String::new());
        }
        Ok(fs::read_to_string(self.facts_path())?)
    }

    /// Bump the reference count for a fact id (recall tracking).
    pub fn mark_referenced(&self, fact_id: &str) -> Result<(), MemoryStoreError> {
        let mut metadata = self.load_metadata()?;
        *metadata
            .reference_counts
            .entry(fact_id.to_string())
            .or_insert(0) += 1;
        self.save_metadata(&metadata)
    }

    fn load_metadata(&self) -> Result<MemoryMetadata, MemoryStoreError> {
        if !self.metadata_path().is_file() {
            return Ok(MemoryMetadata::default());
        }
        Ok(serde_json::from_slice(&fs::read(self.metadata_path())?)?)
    }

    fn save_metadata(&self, metadata: &MemoryMetadata) -> Result<(), MemoryStoreError> {
        fs::create_dir_all(&self.root)?;
        let tmp = self.metadata_path().with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(metadata)?)?;
        fs::rename(&tmp, self.metadata_path())?;
        Ok(())
    }
}

/// A captured problem/fix pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub solution_id: SolutionId,
    pub problem: String,
    pub fix: String,
    #[serde(default)]
    pub files_changed: Vec<PathBuf>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<String>,
    pub captured_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<TaskId>,
}

/// One-file-per-solution store with a rebuildable index.
pub struct SolutionStore {
    root: PathBuf,
}

impl SolutionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn solution_path(&self, id: &SolutionId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    /// Persist a solution and refresh the index.
    pub fn save(&self, record: &SolutionRecord) -> Result<(), MemoryStoreError> {
        fs::create_dir_all(&self.root)?;
        fs::write(
            self.solution_path(&record.solution_id),
            serde_json::to_vec_pretty(record)?,
        )?;
        self.rebuild_index()?;
        Ok(())
    }

    pub fn get(&self, id: &SolutionId) -> Result<SolutionRecord, MemoryStoreError> {
        let path = self.solution_path(id);
        if !path.is_file() {
            return Err(MemoryStoreError::NotFound(id.to_string()));
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    /// Load every stored solution (index order).
    pub fn load_all(&self) -> Result<Vec<SolutionRecord>, MemoryStoreError> {
        let mut records = Vec::new();
        for id in self.index()? {
            match self.get(&id) {
                Ok(record) => records.push(record),
                // Index entries can go stale if a file is removed by hand;
                // rebuild_index() heals them on the next save.
                Err(MemoryStoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    /// Current index, rebuilding from directory contents when missing.
    pub fn index(&self) -> Result<Vec<SolutionId>, MemoryStoreError> {
        if !self.index_path().is_file() {
            self.rebuild_index()?;
        }
        if !self.index_path().is_file() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&fs::read(self.index_path())?)?)
    }

    /// Rebuild `index.json` by listing solution files.
    pub fn rebuild_index(&self) -> Result<(), MemoryStoreError> {
        if !self.root.is_dir() {
            return Ok(());
        }
        let mut ids: Vec<SolutionId> = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name == "index.json" || !name.ends_with(".json") {
                continue;
            }
            ids.push(SolutionId::new(name.trim_end_matches(".json")));
        }
        ids.sort();
        fs::write(self.index_path(), serde_json::to_vec_pretty(&ids)?)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
