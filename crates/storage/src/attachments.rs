// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed attachment store for evidence payloads.
//!
//! Content lives at `attachments/<sha256>.<ext>` with a JSON sidecar
//! carrying provenance. Identical content deduplicates on hash.

use pilot_core::EvidenceId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Default per-attachment size cap (5 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

const MIME_ALLOWLIST: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("text/plain", "txt"),
    ("text/markdown", "md"),
    ("application/json", "json"),
];

/// Errors from attachment operations
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("attachment too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },
    #[error("disallowed attachment type: {mime}")]
    DisallowedMime { mime: String },
    #[error("attachment store full: {would_use} bytes (cap {cap})")]
    TotalCapExceeded { would_use: u64, cap: u64 },
    #[error("attachment not found: {sha256}")]
    NotFound { sha256: String },
}

/// Sidecar metadata for one stored attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub evidence_id: EvidenceId,
    pub original_name: String,
    pub mime_type: String,
    pub sha256: String,
    pub size: u64,
}

/// Store rooted at an `attachments/` directory.
pub struct AttachmentStore {
    root: PathBuf,
    max_bytes: u64,
    total_cap: Option<u64>,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            total_cap: None,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Cap the total bytes of stored content (unset = unbounded).
    pub fn with_total_cap(mut self, cap: u64) -> Self {
        self.total_cap = Some(cap);
        self
    }

    /// The per-attachment size cap.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn extension_for(mime: &str) -> Option<&'static str> {
        MIME_ALLOWLIST
            .iter()
            .find(|(allowed, _)| *allowed == mime)
            .map(|(_, ext)| *ext)
    }

    fn content_path(&self, sha256: &str, ext: &str) -> PathBuf {
        self.root.join(format!("{sha256}.{ext}"))
    }

    fn sidecar_path(&self, sha256: &str) -> PathBuf {
        self.root.join(format!("{sha256}.json"))
    }

    /// Store content, returning the sidecar metadata.
    ///
    /// Re-storing identical content is a no-op returning the existing
    /// metadata (first writer wins for provenance).
    pub fn store(
        &self,
        evidence_id: EvidenceId,
        original_name: impl Into<String>,
        mime_type: &str,
        content: &[u8],
    ) -> Result<AttachmentMeta, AttachmentError> {
        let Some(ext) = Self::extension_for(mime_type) else {
            return Err(AttachmentError::DisallowedMime {
                mime: mime_type.to_string(),
            });
        };

        let size = content.len() as u64;
        if size > self.max_bytes {
            return Err(AttachmentError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        let sha256 = format!("{:x}", Sha256::digest(content));

        // Dedup: identical content keeps its original sidecar
        if self.sidecar_path(&sha256).is_file() {
            return self.meta(&sha256);
        }

        if let Some(cap) = self.total_cap {
            let would_use = self.total_bytes()? + size;
            if would_use > cap {
                return Err(AttachmentError::TotalCapExceeded { would_use, cap });
            }
        }

        fs::create_dir_all(&self.root)?;
        fs::write(self.content_path(&sha256, ext), content)?;

        let meta = AttachmentMeta {
            evidence_id,
            original_name: original_name.into(),
            mime_type: mime_type.to_string(),
            sha256: sha256.clone(),
            size,
        };
        fs::write(
            self.sidecar_path(&sha256),
            serde_json::to_vec_pretty(&meta)?,
        )?;

        Ok(meta)
    }

    /// Load sidecar metadata by hash.
    pub fn meta(&self, sha256: &str) -> Result<AttachmentMeta, AttachmentError> {
        let path = self.sidecar_path(sha256);
        if !path.is_file() {
            return Err(AttachmentError::NotFound {
                sha256: sha256.to_string(),
            });
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    /// Load content bytes by hash.
    pub fn load(&self, sha256: &str) -> Result<Vec<u8>, AttachmentError> {
        let meta = self.meta(sha256)?;
        let ext = Self::extension_for(&meta.mime_type).unwrap_or("bin");
        Ok(fs::read(self.content_path(sha256, ext))?)
    }

    fn total_bytes(&self) -> Result<u64, AttachmentError> {
        if !self.root.is_dir() {
            return Ok(0);
        }
        let mut total = 0u64;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|e| e != "json") {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
#[path = "attachments_tests.rs"]
mod tests;
