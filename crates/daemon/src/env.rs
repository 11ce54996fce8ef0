// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-directory resolution and the on-disk layout.

use std::path::PathBuf;

/// Every path the daemon persists to, rooted at one state directory.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub state_dir: PathBuf,
    pub events_path: PathBuf,
    pub active_task_path: PathBuf,
    pub decisions_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub memory_dir: PathBuf,
    pub solutions_dir: PathBuf,
    pub checkpoints_dir: PathBuf,
    pub attachments_dir: PathBuf,
    pub generated_tools_dir: PathBuf,
    pub config_path: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub socket_path: PathBuf,
}

impl StatePaths {
    /// Layout under an explicit root (tests, `PILOT_STATE_DIR`).
    pub fn under(state_dir: PathBuf) -> Self {
        Self {
            events_path: state_dir.join("events.jsonl"),
            active_task_path: state_dir.join("state/active-task.json"),
            decisions_path: state_dir.join("state/decisions.json"),
            snapshot_path: state_dir.join("state/projection.snap"),
            memory_dir: state_dir.join("memory"),
            solutions_dir: state_dir.join("memory/solutions"),
            checkpoints_dir: state_dir.join("checkpoints"),
            attachments_dir: state_dir.join("attachments"),
            generated_tools_dir: state_dir.join("tools/generated"),
            config_path: state_dir.join("config.toml"),
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            socket_path: state_dir.join("daemon.sock"),
            state_dir,
        }
    }

    /// Default user-level layout: `$PILOT_STATE_DIR`, else
    /// `$XDG_STATE_HOME/pilot`, else `~/.local/state/pilot`.
    pub fn resolve() -> Self {
        let state_dir = std::env::var_os("PILOT_STATE_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::state_dir().map(|d| d.join("pilot")))
            .or_else(|| dirs::home_dir().map(|h| h.join(".local/state/pilot")))
            .unwrap_or_else(|| PathBuf::from(".pilot-state"));
        Self::under(state_dir)
    }
}
