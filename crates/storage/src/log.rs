// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL event log.
//!
//! One canonical event per line, newline terminated, fsynced before the
//! append is acknowledged. The log is the single source of truth; every
//! other store is a projection or a referenced artifact.
//!
//! Append-time invariants:
//! - event ids are unique and monotone within a task (assigned here)
//! - timestamps are monotone non-decreasing within a task
//! - the type tag is in the vocabulary (unknown kinds are rejected)
//! - `stage != none` requires `mode == MISSION`
//! - `parent_event_id` references a prior event of the same task

use chrono::{DateTime, Utc};
use pilot_core::{Event, EventBody, EventId, Mode, Stage, TaskId};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur appending to or reading the event log
#[derive(Debug, Error)]
pub enum AppendError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown event kind: {kind}")]
    UnknownKind { kind: String },
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },
}

/// Per-task append cursor.
#[derive(Debug, Default)]
struct TaskCursor {
    /// Next sequence number to assign within the task
    next_seq: u64,
    /// Timestamp of the last appended event
    last_timestamp: Option<DateTime<Utc>>,
    /// Id of the last appended event (ids are lexically monotone)
    last_event_id: Option<EventId>,
    /// All event ids appended for the task, for parent validation
    ids: HashSet<String>,
}

/// Append-only event store over `events.jsonl`.
pub struct EventLog {
    file: File,
    path: PathBuf,
    cursors: HashMap<TaskId, TaskCursor>,
}

impl EventLog {
    /// Open or create the log at `path`, scanning existing entries to
    /// rebuild per-task cursors.
    ///
    /// A corrupt tail is rotated to a `.bak` file and the valid prefix
    /// preserved, so a torn write never wedges startup.
    pub fn open(path: &Path) -> Result<Self, AppendError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let (events, corrupt) = Self::scan(&file)?;

        if corrupt {
            drop(file);
            let bak_path = crate::snapshot::rotate_bak_path(path);
            warn!(
                path = %path.display(),
                bak = %bak_path.display(),
                valid_entries = events.len(),
                "Corrupt event log detected, rotating to .bak and preserving valid entries",
            );
            std::fs::rename(path, &bak_path)?;

            {
                let mut new_file = File::create(path)?;
                for event in &events {
                    let line = serde_json::to_vec(event)?;
                    new_file.write_all(&line)?;
                    new_file.write_all(b"\n")?;
                }
                new_file.sync_all()?;
            }

            file = OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(path)?;
        }

        let mut cursors: HashMap<TaskId, TaskCursor> = HashMap::new();
        for event in &events {
            let cursor = cursors.entry(event.task_id.clone()).or_default();
            cursor.next_seq += 1;
            cursor.last_timestamp = Some(event.timestamp);
            cursor.last_event_id = Some(event.event_id.clone());
            cursor.ids.insert(event.event_id.as_str().to_string());
        }

        Ok(Self {
            file,
            path: path.to_owned(),
            cursors,
        })
    }

    /// Scan all parseable events; returns `(events, corrupt)` where
    /// `corrupt` is true if an unparseable line was hit (scan stops there).
    fn scan(file: &File) -> Result<(Vec<Event>, bool), AppendError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut events = Vec::new();
        let mut corrupt = false;
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    corrupt = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<Event>(trimmed) {
                Ok(event) => events.push(event),
                Err(_) => {
                    corrupt = true;
                    break;
                }
            }
        }

        Ok((events, corrupt))
    }

    /// Append a single event, assigning its id, and fsync before returning.
    ///
    /// Returns the stored event (with its assigned id). Nothing is written
    /// when validation fails.
    pub fn append(&mut self, mut event: Event) -> Result<Event, AppendError> {
        // Vocabulary check: unknown kinds never enter the log.
        if let EventBody::Unknown(raw) = &event.body {
            return Err(AppendError::UnknownKind {
                kind: raw.kind.clone(),
            });
        }

        if event.stage != Stage::None && event.mode != Mode::Mission {
            return Err(AppendError::InvariantViolation {
                message: format!(
                    "stage {} outside MISSION (mode {})",
                    event.stage, event.mode
                ),
            });
        }

        let cursor = self.cursors.entry(event.task_id.clone()).or_default();

        if let Some(last) = cursor.last_timestamp {
            if event.timestamp < last {
                return Err(AppendError::InvariantViolation {
                    message: format!(
                        "timestamp regression for task {}: {} < {}",
                        event.task_id, event.timestamp, last
                    ),
                });
            }
        }

        if let Some(parent) = &event.parent_event_id {
            if !cursor.ids.contains(parent.as_str()) {
                return Err(AppendError::InvariantViolation {
                    message: format!(
                        "parent_event_id {} does not reference a prior event of task {}",
                        parent, event.task_id
                    ),
                });
            }
        }

        if event.evidence_ids.iter().any(|id| id.is_empty()) {
            return Err(AppendError::InvariantViolation {
                message: "empty evidence id".to_string(),
            });
        }

        let seq = cursor.next_seq + 1;
        if event.event_id.is_empty() {
            event.event_id = EventId::new(format!("ev-{seq:08}"));
        }
        // Monotone and unique within the task, whether assigned or supplied.
        if cursor.ids.contains(event.event_id.as_str()) {
            return Err(AppendError::InvariantViolation {
                message: format!("duplicate event id {}", event.event_id),
            });
        }
        if let Some(last_id) = &cursor.last_event_id {
            if event.event_id <= *last_id {
                return Err(AppendError::InvariantViolation {
                    message: format!(
                        "event id {} not monotone after {}",
                        event.event_id, last_id
                    ),
                });
            }
        }

        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_all()?;

        cursor.next_seq = seq;
        cursor.last_timestamp = Some(event.timestamp);
        cursor.last_event_id = Some(event.event_id.clone());
        cursor.ids.insert(event.event_id.as_str().to_string());

        Ok(event)
    }

    /// All events in append order. Linear scan; the log keeps no indexes.
    pub fn get_all(&self) -> Result<Vec<Event>, AppendError> {
        let (events, _) = Self::scan(&self.file)?;
        Ok(events)
    }

    /// Events of one task in append order.
    pub fn get_by_task(&self, task_id: &str) -> Result<Vec<Event>, AppendError> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|e| e.task_id == task_id)
            .collect())
    }

    /// Events whose type tag equals `type_name`, in append order.
    pub fn get_by_type(&self, type_name: &str) -> Result<Vec<Event>, AppendError> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|e| e.type_name() == type_name)
            .collect())
    }

    /// Number of events appended for a task.
    pub fn task_len(&self, task_id: &str) -> u64 {
        self.cursors
            .get(task_id)
            .map(|c| c.next_seq)
            .unwrap_or(0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
