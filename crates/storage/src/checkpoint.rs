// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-effect file checkpoints.
//!
//! Before any write-class effect the executor snapshots every file it will
//! touch under `checkpoints/<checkpoint_id>/`. A denial or a failure mid
//! effect restores the snapshot, including deleting files that did not
//! exist at checkpoint time. Checkpoints are never removed implicitly while
//! their task is live; retention is the host's concern.

use chrono::{DateTime, Utc};
use pilot_core::{Checkpoint, CheckpointId, Mode, Stage};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("checkpoint not found: {0}")]
    NotFound(String),
    #[error("checkpoint path escapes workspace: {0}")]
    PathEscape(String),
}

/// One file recorded in a checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    /// Path relative to the workspace root
    path: PathBuf,
    /// Whether the file existed when the checkpoint was taken
    existed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    checkpoint: Checkpoint,
    entries: Vec<ManifestEntry>,
    created_at: DateTime<Utc>,
}

/// Store of pre-effect file snapshots under a checkpoints directory.
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, id: &CheckpointId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn manifest_path(&self, id: &CheckpointId) -> PathBuf {
        self.dir(id).join("manifest.json")
    }

    /// Snapshot `files` (workspace-relative paths) before a write effect.
    ///
    /// Missing files are recorded so a restore deletes whatever the effect
    /// created in their place.
    pub fn create(
        &self,
        checkpoint_id: CheckpointId,
        workspace_root: &Path,
        files: &[PathBuf],
        mode: Mode,
        stage: Stage,
        description: impl Into<String>,
    ) -> Result<Checkpoint, CheckpointError> {
        let dir = self.dir(&checkpoint_id);
        let files_dir = dir.join("files");
        fs::create_dir_all(&files_dir)?;

        let mut entries = Vec::with_capacity(files.len());
        for rel in files {
            if rel.is_absolute() || rel.components().any(|c| c.as_os_str() == "..") {
                return Err(CheckpointError::PathEscape(rel.display().to_string()));
            }
            let source = workspace_root.join(rel);
            let existed = source.is_file();
            if existed {
                let dest = files_dir.join(rel);
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(&source, &dest)?;
            }
            entries.push(ManifestEntry {
                path: rel.clone(),
                existed,
            });
        }

        let checkpoint = Checkpoint {
            checkpoint_id: checkpoint_id.clone(),
            files: files.to_vec(),
            mode_at_creation: mode,
            stage_at_creation: stage,
            description: description.into(),
        };

        let manifest = Manifest {
            checkpoint: checkpoint.clone(),
            entries,
            created_at: Utc::now(),
        };

        // Manifest last and durable: a checkpoint without a manifest is
        // treated as never taken.
        let tmp = self.manifest_path(&checkpoint_id).with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&serde_json::to_vec_pretty(&manifest)?)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, self.manifest_path(&checkpoint_id))?;

        Ok(checkpoint)
    }

    /// Whether a completed checkpoint exists.
    pub fn contains(&self, checkpoint_id: &CheckpointId) -> bool {
        self.manifest_path(checkpoint_id).is_file()
    }

    /// Load checkpoint metadata.
    pub fn get(&self, checkpoint_id: &CheckpointId) -> Result<Checkpoint, CheckpointError> {
        Ok(self.load_manifest(checkpoint_id)?.checkpoint)
    }

    /// Restore every file of a checkpoint into the workspace.
    ///
    /// Files that did not exist at creation are deleted. Returns the
    /// workspace-relative paths that were written or removed.
    pub fn restore(
        &self,
        checkpoint_id: &CheckpointId,
        workspace_root: &Path,
    ) -> Result<Vec<PathBuf>, CheckpointError> {
        let manifest = self.load_manifest(checkpoint_id)?;
        let files_dir = self.dir(checkpoint_id).join("files");

        let mut touched = Vec::with_capacity(manifest.entries.len());
        for entry in &manifest.entries {
            let target = workspace_root.join(&entry.path);
            if entry.existed {
                let source = files_dir.join(&entry.path);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(&source, &target)?;
            } else if target.exists() {
                fs::remove_file(&target)?;
            }
            touched.push(entry.path.clone());
        }

        Ok(touched)
    }

    fn load_manifest(&self, checkpoint_id: &CheckpointId) -> Result<Manifest, CheckpointError> {
        let path = self.manifest_path(checkpoint_id);
        if !path.is_file() {
            return Err(CheckpointError::NotFound(checkpoint_id.to_string()));
        }
        let data = fs::read(&path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
