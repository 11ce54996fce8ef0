// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for Pilot: the append-only event log and every on-disk
//! store derived from or referenced by it.

mod active_task;
mod attachments;
mod checkpoint;
mod decisions;
mod log;
mod memory;
mod snapshot;
mod state;
mod tools;

pub use active_task::{ActiveTaskPointer, PointerError};
pub use attachments::{AttachmentError, AttachmentMeta, AttachmentStore};
pub use checkpoint::{CheckpointError, CheckpointStore};
pub use decisions::{DecisionKind, DecisionRecord, DecisionStore, DecisionStoreError};
pub use log::{AppendError, EventLog};
pub use memory::{FactsUpdate, MemoryStore, MemoryStoreError, SolutionRecord, SolutionStore};
pub use snapshot::{ProjectionSnapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::Projection;
pub use tools::{GeneratedToolEntry, GeneratedToolStore, ToolRegistryError};
