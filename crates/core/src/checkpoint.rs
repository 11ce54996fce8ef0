// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-effect file checkpoints.

use crate::id::CheckpointId;
use crate::mode::{Mode, Stage};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata for a file snapshot taken before a write-class effect.
///
/// Created before the effect, restored on denial or failure, never dropped
/// implicitly while the task is live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: CheckpointId,
    pub files: Vec<PathBuf>,
    pub mode_at_creation: Mode,
    pub stage_at_creation: Stage,
    pub description: String,
}
