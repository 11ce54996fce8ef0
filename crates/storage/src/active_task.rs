// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active-task pointer (`state/active-task.json`).
//!
//! The pointer is the crash detector: it is saved whenever the active task
//! changes and stamped `cleanly_exited = true` only on orderly shutdown. A
//! pointer found without that stamp at startup becomes a recovery offer.

use chrono::{DateTime, Utc};
use pilot_core::{Mode, Stage, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PointerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pointer to the task the host was last working on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTaskPointer {
    pub task_id: TaskId,
    pub mode: Mode,
    pub stage: Stage,
    pub status: TaskStatus,
    pub last_updated_at: DateTime<Utc>,
    pub cleanly_exited: bool,
}

impl ActiveTaskPointer {
    pub fn new(task_id: TaskId, mode: Mode, stage: Stage, status: TaskStatus) -> Self {
        Self {
            task_id,
            mode,
            stage,
            status,
            last_updated_at: Utc::now(),
            cleanly_exited: false,
        }
    }

    /// Save atomically (tmp + rename).
    pub fn save(&self, path: &PathBuf) -> Result<(), PointerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&serde_json::to_vec_pretty(self)?)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load the pointer if present; a corrupt pointer is discarded with a
    /// warning rather than blocking startup.
    pub fn load(path: &PathBuf) -> Result<Option<Self>, PointerError> {
        if !path.is_file() {
            return Ok(None);
        }
        match serde_json::from_slice(&fs::read(path)?) {
            Ok(pointer) => Ok(Some(pointer)),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Corrupt active-task pointer, discarding");
                fs::remove_file(path)?;
                Ok(None)
            }
        }
    }

    /// Stamp the pointer as cleanly exited (called on orderly shutdown).
    pub fn mark_clean_exit(path: &PathBuf) -> Result<(), PointerError> {
        if let Some(mut pointer) = Self::load(path)? {
            pointer.cleanly_exited = true;
            pointer.last_updated_at = Utc::now();
            pointer.save(path)?;
        }
        Ok(())
    }

    /// Remove the pointer (task finished or discarded).
    pub fn clear(path: &PathBuf) -> Result<(), PointerError> {
        if path.is_file() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "active_task_tests.rs"]
mod tests;
