// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for host/UI communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.
//! Everything the UI can ask for goes through [`Request`]; everything it
//! reads back is a [`Response`]. Event streaming is poll-based via
//! `Query::Events` / `Query::NormalizedEvents`.

use pilot_core::{
    ApprovalDecision, ApprovalId, ApprovalScope, Event, Mode, NormalizedEvent, PlanId, TaskId,
    TaskState,
};
use pilot_intent::IntentAnalysis;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames above this size are rejected rather than buffered.
const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(u32),
}

/// Request from the host UI to the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Submit a prompt for routing
    SubmitIntent {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode_override: Option<Mode>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        references: Vec<PathBuf>,
    },

    /// Answer an outstanding clarification
    ClarificationResponse { task_id: TaskId, response: String },

    /// Resolve a pending approval
    ResolveApproval {
        approval_id: ApprovalId,
        decision: ApprovalDecision,
        scope: ApprovalScope,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        modified_details: Option<serde_json::Value>,
    },

    /// Resolve a pending scope expansion
    ResolveScopeExpansion { request_id: String, approved: bool },

    /// Deny every approval pending on a superseded plan
    SupersedePlan { task_id: TaskId, plan_id: PlanId },

    Pause { task_id: TaskId },
    Resume { task_id: TaskId },
    Stop { task_id: TaskId },

    /// Resume the interrupted task found at startup
    RecoverTask { task_id: TaskId },
    /// Discard the interrupted task found at startup
    DiscardTask { task_id: TaskId },

    /// Query state
    Query { query: Query },

    /// Graceful shutdown (stamps the clean-exit marker)
    Shutdown,
}

/// Read-only queries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Query {
    TaskState { task_id: TaskId },
    Events { task_id: TaskId },
    NormalizedEvents { task_id: TaskId },
    PendingApprovals,
}

/// Response from the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Ack,
    Pong,
    Intent { analysis: IntentAnalysis },
    TaskState { state: TaskState },
    Events { events: Vec<Event> },
    NormalizedEvents { events: Vec<NormalizedEvent> },
    PendingApprovals { approval_ids: Vec<ApprovalId> },
    Error { message: String },
}

/// Write one length-prefixed JSON frame.
pub async fn write_frame<W, T>(writer: &mut W, payload: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = serde_json::to_vec(payload)?;
    let len = bytes.len() as u32;
    if len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed JSON frame. `Ok(None)` on a clean EOF at a
/// frame boundary.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(Some(serde_json::from_slice(&payload)?))
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
