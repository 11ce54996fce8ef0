// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Projection snapshot cache.
//!
//! Replay of `events.jsonl` is always authoritative; the snapshot only lets
//! startup skip re-folding a long log. Saved zstd-compressed, written
//! tmp → fsync → rename → fsync dir so a crash mid-save never corrupts it.

use crate::Projection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Bumped when the projection layout changes; mismatched snapshots are
/// discarded and rebuilt from the log.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// Errors that can occur in snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compress(String),
}

/// A snapshot of the projection at a point in the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionSnapshot {
    pub version: u32,
    /// Total number of log events folded into this snapshot
    pub event_count: u64,
    pub projection: Projection,
    pub created_at: DateTime<Utc>,
}

impl ProjectionSnapshot {
    pub fn new(event_count: u64, projection: Projection) -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            event_count,
            projection,
            created_at: Utc::now(),
        }
    }

    /// Save compressed and atomically (write to .tmp, fsync, rename, fsync dir).
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        let json_bytes = serde_json::to_vec(self)?;
        // zstd level 3 is a good balance of speed and compression
        let compressed = zstd::encode_all(json_bytes.as_slice(), 3)
            .map_err(|e| SnapshotError::Compress(e.to_string()))?;

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&compressed)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, path)?;

        if let Some(parent) = path.parent() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }

        Ok(())
    }

    /// Load a snapshot if one exists.
    ///
    /// Returns `Ok(None)` when the file is missing, corrupt, or from a
    /// different version; corrupt files are rotated to `.bak` so startup
    /// falls back to full log replay.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let decoded = zstd::stream::read::Decoder::new(file)
            .map_err(|e| SnapshotError::Compress(e.to_string()))
            .and_then(|decoder| {
                serde_json::from_reader::<_, Self>(decoder).map_err(SnapshotError::Json)
            });

        match decoded {
            Ok(snapshot) if snapshot.version == CURRENT_SNAPSHOT_VERSION => Ok(Some(snapshot)),
            Ok(snapshot) => {
                warn!(
                    version = snapshot.version,
                    expected = CURRENT_SNAPSHOT_VERSION,
                    "Snapshot version mismatch, rebuilding from log",
                );
                Ok(None)
            }
            Err(e) => {
                let bak_path = rotate_bak_path(path);
                warn!(
                    error = %e,
                    path = %path.display(),
                    bak = %bak_path.display(),
                    "Corrupt snapshot, moving to .bak and replaying the log",
                );
                fs::rename(path, &bak_path)?;
                Ok(None)
            }
        }
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
