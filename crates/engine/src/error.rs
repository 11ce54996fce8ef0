// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use pilot_core::{Mode, Stage, TaskStatus, ToolAction};
use thiserror::Error;

/// Errors that can occur in the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to publish event: {0}")]
    Publish(String),

    #[error("action {action} not permitted in {mode}/{stage}")]
    ModeViolation {
        action: ToolAction,
        mode: Mode,
        stage: Stage,
    },

    #[error("stage {stage} requires MISSION mode (current: {mode})")]
    StageOutsideMission { stage: Stage, mode: Mode },

    #[error("{phase} not permitted while task is {status}")]
    InvalidPhase { phase: String, status: TaskStatus },

    #[error("tool request exceeds the scope contract: {reason}")]
    ScopeBlocked { reason: String },

    #[error("approval denied: {description}")]
    ApprovalDenied { description: String },

    #[error("approval channel closed before resolution")]
    ApprovalDropped,

    #[error("Path traversal detected: {path}")]
    PathTraversal { path: String },

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] pilot_storage::CheckpointError),

    #[error("attachment error: {0}")]
    Attachment(#[from] pilot_storage::AttachmentError),

    #[error("memory store error: {0}")]
    Memory(#[from] pilot_storage::MemoryStoreError),

    #[error("tool host error: {0}")]
    ToolHost(String),

    #[error("repair attempts exhausted after {attempts} tries")]
    RepairExhausted { attempts: u32 },
}
