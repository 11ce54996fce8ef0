// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed evidence references cited by events.

use crate::id::{EventId, EvidenceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What an evidence record captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Log,
    Diff,
    File,
    Test,
    Error,
}

/// A content-addressed record derived from a tool or observation.
///
/// `content_ref` points into the attachment store (sha-256 addressed); the
/// record itself carries only the summary and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub evidence_id: EvidenceId,
    pub kind: EvidenceKind,
    pub source_event_id: EventId,
    pub content_ref: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}
