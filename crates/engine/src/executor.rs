// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tool executor: every tool invocation funnels through here.
//!
//! Order of the gate, per invocation:
//! 1. classify the action into a tool class
//! 2. mode/stage enforcement (`mode_violation` on rejection)
//! 3. scope contract check (proposes an expansion when it would unblock)
//! 4. workspace-root path resolution (traversal fails fast)
//! 5. pre-effect checkpoint for write/exec actions
//! 6. redacted `tool_start`
//! 7. blocking user approval for write/exec actions
//! 8. delegated execution through the host
//! 9. evidence capture and `tool_end` (parented to `tool_start`)
//!
//! Any failure after the checkpoint restores it. A denial or an execution
//! error still emits `tool_end{success: false}`, so every `tool_start` has
//! exactly one matching end.

use crate::approval::ApprovalManager;
use crate::error::EngineError;
use crate::mode::ModeManager;
use crate::publish::EventPublisher;
use crate::redact::redact_inputs;
use crate::scope::{self, ScopeManager, ScopeRequest};
use async_trait::async_trait;
use pilot_core::{
    ApprovalKind, CheckpointId, Event, EventId, EventKind, EvidenceId, EvidenceKind, IdGen, Mode,
    ScopeSummary, Stage, TaskId, ToolAction, ToolClass, UuidIdGen,
};
use pilot_storage::{AttachmentStore, CheckpointStore};
use serde_json::json;
use std::path::{Component, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Failure surfaced by the host adapter.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ToolHostError(pub String);

/// One tool call, with workspace-relative target files.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: String,
    pub action: ToolAction,
    pub files: Vec<PathBuf>,
    pub inputs: serde_json::Value,
    /// Lines this invocation will add to the retrieval budget (reads)
    pub lines: u64,
}

/// What the host produced.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: Vec<u8>,
    pub summary: String,
    pub evidence_kind: EvidenceKind,
    /// Diff stats for write-class tools
    pub lines_added: u64,
    pub lines_removed: u64,
    /// Exit code for exec-class tools
    pub exit_code: Option<i32>,
}

/// Successful run: output plus the recorded provenance.
#[derive(Debug)]
pub struct ToolRunResult {
    pub output: ToolOutput,
    pub evidence_id: EvidenceId,
    pub tool_start_id: EventId,
    pub checkpoint_id: Option<CheckpointId>,
}

/// The host side of tool execution (file edits, process spawning, search).
/// Everything effectful is delegated; the executor owns only the gate.
#[async_trait]
pub trait ToolHost: Send + Sync {
    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolHostError>;
}

/// Mode-, scope-, approval-, and checkpoint-gated tool execution.
pub struct ToolExecutor<G: IdGen = UuidIdGen> {
    workspace_root: PathBuf,
    publisher: Arc<dyn EventPublisher>,
    approvals: Arc<ApprovalManager<G>>,
    scopes: ScopeManager<G>,
    checkpoints: CheckpointStore,
    attachments: AttachmentStore,
    host: Arc<dyn ToolHost>,
    idgen: G,
}

impl<G: IdGen> ToolExecutor<G> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        workspace_root: PathBuf,
        publisher: Arc<dyn EventPublisher>,
        approvals: Arc<ApprovalManager<G>>,
        scopes: ScopeManager<G>,
        checkpoints: CheckpointStore,
        attachments: AttachmentStore,
        host: Arc<dyn ToolHost>,
        idgen: G,
    ) -> Self {
        Self {
            workspace_root,
            publisher,
            approvals,
            scopes,
            checkpoints,
            attachments,
            host,
            idgen,
        }
    }

    /// Run one invocation through the full gate.
    pub async fn run(
        &self,
        modes: &ModeManager,
        summary: &ScopeSummary,
        invocation: ToolInvocation,
    ) -> Result<ToolRunResult, EngineError> {
        let task_id = modes.task_id().clone();
        let mode = modes.mode();
        let stage = modes.stage();

        // 1-2. classify + mode enforcement
        let category = classify(invocation.action);
        if !modes.enforce_action(invocation.action)? {
            return Err(EngineError::ModeViolation {
                action: invocation.action,
                mode,
                stage,
            });
        }

        // 3. scope contract
        let check = scope::validate_action(
            summary,
            &ScopeRequest {
                tool: category,
                files: invocation.files.clone(),
                lines: invocation.lines,
            },
        );
        if !check.allowed {
            let reason = check.reason.clone().unwrap_or_default();
            if let Some(expansion) = check.requires_expansion {
                self.scopes
                    .request_expansion(task_id.clone(), mode, stage, expansion)?;
            }
            return Err(EngineError::ScopeBlocked { reason });
        }

        // 4. path resolution against the workspace root
        for file in &invocation.files {
            if escapes_workspace(file) {
                return Err(EngineError::PathTraversal {
                    path: file.display().to_string(),
                });
            }
        }

        // 5. pre-effect checkpoint, before any approval is requested
        let checkpoint_id = if matches!(category, ToolClass::Write | ToolClass::Exec) {
            let id = CheckpointId::new(format!("cp-{}", self.idgen.next()));
            self.checkpoints.create(
                id.clone(),
                &self.workspace_root,
                &invocation.files,
                mode,
                stage,
                format!("before {}", invocation.tool),
            )?;
            self.publisher.publish(Event::new(
                task_id.clone(),
                mode,
                stage,
                EventKind::CheckpointCreated {
                    checkpoint_id: id.clone(),
                    files: invocation.files.clone(),
                    description: format!("before {}", invocation.tool),
                },
            ))?;
            Some(id)
        } else {
            None
        };

        // 6. redacted tool_start
        let tool_start = self.publisher.publish(Event::new(
            task_id.clone(),
            mode,
            stage,
            EventKind::ToolStart {
                tool: invocation.tool.clone(),
                category,
                inputs: redact_inputs(&invocation.inputs),
            },
        ))?;

        // 7. blocking approval for effectful actions
        if let Some(kind) = approval_kind_for(category) {
            let resolution = self
                .approvals
                .request_approval(
                    task_id.clone(),
                    mode,
                    stage,
                    kind,
                    format!("{} on {} file(s)", invocation.tool, invocation.files.len()),
                    json!({
                        "tool": invocation.tool,
                        "files": invocation.files,
                    }),
                    None,
                )
                .await?;

            if !resolution.is_approved() {
                self.restore(&task_id, mode, stage, &checkpoint_id, "approval denied")?;
                self.finish_tool(
                    &task_id,
                    mode,
                    stage,
                    &invocation,
                    &tool_start.event_id,
                    Err("approval denied"),
                    &[],
                )?;
                return Err(EngineError::ApprovalDenied {
                    description: invocation.tool.clone(),
                });
            }
        }

        // 8. delegated execution
        match self.host.execute(&invocation).await {
            Ok(mut output) => {
                // Output beyond the transport limit is clipped, recorded as
                // a recovered truncation, and the clipped evidence kept.
                let limit = self.attachments.max_bytes();
                if output.content.len() as u64 > limit {
                    output.content.truncate(limit as usize);
                    self.publisher.publish(Event::new(
                        task_id.clone(),
                        mode,
                        stage,
                        EventKind::TruncatedOutput {
                            recovered: true,
                            limit_bytes: Some(limit),
                            tool: Some(invocation.tool.clone()),
                        },
                    ))?;
                }

                // 9. evidence + tool_end
                let evidence_id = EvidenceId::new(format!("evd-{}", self.idgen.next()));
                self.attachments.store(
                    evidence_id.clone(),
                    invocation.tool.as_str(),
                    "text/plain",
                    &output.content,
                )?;
                self.finish_tool(
                    &task_id,
                    mode,
                    stage,
                    &invocation,
                    &tool_start.event_id,
                    Ok(()),
                    std::slice::from_ref(&evidence_id),
                )?;
                self.publish_effect(&task_id, mode, stage, &invocation, &output, &tool_start.event_id)?;
                Ok(ToolRunResult {
                    output,
                    evidence_id,
                    tool_start_id: tool_start.event_id,
                    checkpoint_id,
                })
            }
            Err(e) => {
                self.restore(&task_id, mode, stage, &checkpoint_id, "tool failed")?;
                self.finish_tool(
                    &task_id,
                    mode,
                    stage,
                    &invocation,
                    &tool_start.event_id,
                    Err(&e.0),
                    &[],
                )?;
                Err(EngineError::ToolHost(e.0))
            }
        }
    }

    fn restore(
        &self,
        task_id: &TaskId,
        mode: Mode,
        stage: Stage,
        checkpoint_id: &Option<CheckpointId>,
        reason: &str,
    ) -> Result<(), EngineError> {
        let Some(id) = checkpoint_id else {
            return Ok(());
        };
        self.checkpoints.restore(id, &self.workspace_root)?;
        self.publisher.publish(Event::new(
            task_id.clone(),
            mode,
            stage,
            EventKind::CheckpointRestored {
                checkpoint_id: id.clone(),
                reason: reason.to_string(),
            },
        ))?;
        Ok(())
    }

    /// Publish the domain event a successful tool implies: reads feed the
    /// retrieval budget, writes record the applied diff, commands mark the
    /// terminal command event.
    fn publish_effect(
        &self,
        task_id: &TaskId,
        mode: Mode,
        stage: Stage,
        invocation: &ToolInvocation,
        output: &ToolOutput,
        tool_start_id: &EventId,
    ) -> Result<(), EngineError> {
        let kind = match invocation.action {
            ToolAction::ReadFile | ToolAction::Retrieve => {
                let per_file = invocation.lines / invocation.files.len().max(1) as u64;
                EventKind::RetrievalCompleted {
                    files: invocation
                        .files
                        .iter()
                        .map(|path| pilot_core::RetrievedFile {
                            path: path.clone(),
                            lines: per_file,
                            line_range: None,
                        })
                        .collect(),
                    lines_retrieved: invocation.lines,
                }
            }
            ToolAction::WriteFile => EventKind::DiffApplied {
                files: invocation.files.clone(),
                lines_added: output.lines_added,
                lines_removed: output.lines_removed,
            },
            ToolAction::ExecuteCommand => EventKind::CommandCompleted {
                command: invocation.tool.clone(),
                exit_code: output.exit_code.unwrap_or(0),
            },
            ToolAction::Plan => return Ok(()),
        };
        self.publisher.publish(
            Event::new(task_id.clone(), mode, stage, kind).with_parent(tool_start_id.clone()),
        )?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_tool(
        &self,
        task_id: &TaskId,
        mode: Mode,
        stage: Stage,
        invocation: &ToolInvocation,
        tool_start_id: &EventId,
        outcome: Result<(), &str>,
        evidence_ids: &[EvidenceId],
    ) -> Result<(), EngineError> {
        let (success, error) = match outcome {
            Ok(()) => (true, None),
            Err(message) => (false, Some(message.to_string())),
        };
        self.publisher.publish(
            Event::new(
                task_id.clone(),
                mode,
                stage,
                EventKind::ToolEnd {
                    tool: invocation.tool.clone(),
                    success,
                    error,
                },
            )
            .with_parent(tool_start_id.clone())
            .with_evidence(evidence_ids.to_vec()),
        )?;
        Ok(())
    }
}

fn classify(action: ToolAction) -> ToolClass {
    match action {
        ToolAction::ReadFile | ToolAction::Retrieve | ToolAction::Plan => ToolClass::Read,
        ToolAction::WriteFile => ToolClass::Write,
        ToolAction::ExecuteCommand => ToolClass::Exec,
    }
}

fn approval_kind_for(category: ToolClass) -> Option<ApprovalKind> {
    match category {
        ToolClass::Read => None,
        ToolClass::Write => Some(ApprovalKind::ApplyDiff),
        ToolClass::Exec => Some(ApprovalKind::Terminal),
    }
}

/// Lexical containment check: target files are workspace-relative and may
/// not yet exist, so resolution is by components rather than canonicalize.
fn escapes_workspace(path: &std::path::Path) -> bool {
    path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
}

/// Scripted host for tests: records invocations and replays queued results.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeToolHost {
    invocations: parking_lot::Mutex<Vec<ToolInvocation>>,
    results: parking_lot::Mutex<Vec<Result<ToolOutput, ToolHostError>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeToolHost {
    /// A host that echoes every invocation successfully.
    pub fn new() -> Self {
        Self {
            invocations: parking_lot::Mutex::new(Vec::new()),
            results: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Queue a result; queued results are consumed in order, after which
    /// the host echoes successes again.
    pub fn push_result(&self, result: Result<ToolOutput, ToolHostError>) {
        self.results.lock().push(result);
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeToolHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ToolHost for FakeToolHost {
    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolHostError> {
        self.invocations.lock().push(invocation.clone());
        let queued = {
            let mut results = self.results.lock();
            if results.is_empty() {
                None
            } else {
                Some(results.remove(0))
            }
        };
        queued.unwrap_or_else(|| {
            Ok(ToolOutput {
                content: format!("ran {}", invocation.tool).into_bytes(),
                summary: format!("{} ok", invocation.tool),
                evidence_kind: EvidenceKind::Log,
                lines_added: 0,
                lines_removed: 0,
                exit_code: Some(0),
            })
        })
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
