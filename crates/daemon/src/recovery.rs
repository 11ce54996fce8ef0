// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash detection at startup.
//!
//! The active-task pointer is stamped `cleanly_exited` on orderly shutdown.
//! Finding it unstamped means the previous host died mid-task; the pointer
//! becomes a recovery offer (resume or discard) instead of silently
//! resuming or silently losing work.

use pilot_storage::{ActiveTaskPointer, PointerError};
use std::path::PathBuf;

/// What startup found on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum StartupDisposition {
    /// No active task was recorded
    Fresh,
    /// Previous run shut down cleanly; the pointer is informational
    CleanExit(ActiveTaskPointer),
    /// Previous run died mid-task; offer resume / discard
    RecoveryOffer(ActiveTaskPointer),
}

/// Inspect the active-task pointer.
pub fn detect(active_task_path: &PathBuf) -> Result<StartupDisposition, PointerError> {
    match ActiveTaskPointer::load(active_task_path)? {
        None => Ok(StartupDisposition::Fresh),
        Some(pointer) if pointer.cleanly_exited => Ok(StartupDisposition::CleanExit(pointer)),
        Some(pointer) => Ok(StartupDisposition::RecoveryOffer(pointer)),
    }
}
