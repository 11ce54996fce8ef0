// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The approval gate.
//!
//! `request_approval` publishes `approval_requested` and suspends the caller
//! on a oneshot channel keyed by approval id until the UI calls
//! `resolve_approval`. The pending table is owned here and mutated only by
//! these two operations; after a crash it is rebuilt from unresolved
//! `approval_requested` events.

use crate::error::EngineError;
use crate::publish::EventPublisher;
use chrono::Utc;
use parking_lot::Mutex;
use pilot_core::{
    ApprovalDecision, ApprovalId, ApprovalKind, ApprovalRequest, ApprovalResolution,
    ApprovalScope, Event, EventKind, IdGen, Mode, PlanId, Stage, TaskId, UuidIdGen,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::warn;

struct PendingEntry {
    task_id: TaskId,
    mode: Mode,
    stage: Stage,
    request: ApprovalRequest,
    waiters: Vec<oneshot::Sender<ApprovalResolution>>,
}

/// Blocking user-approval rendezvous.
pub struct ApprovalManager<G: IdGen = UuidIdGen> {
    publisher: Arc<dyn EventPublisher>,
    idgen: G,
    pending: Mutex<HashMap<ApprovalId, PendingEntry>>,
}

impl ApprovalManager<UuidIdGen> {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self::with_idgen(publisher, UuidIdGen)
    }
}

impl<G: IdGen> ApprovalManager<G> {
    pub fn with_idgen(publisher: Arc<dyn EventPublisher>, idgen: G) -> Self {
        Self {
            publisher,
            idgen,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Ids of requests currently awaiting the user, in no particular order.
    pub fn pending_ids(&self) -> Vec<ApprovalId> {
        self.pending.lock().keys().cloned().collect()
    }

    /// The request behind a pending id, if still unresolved.
    pub fn pending_info(&self, approval_id: &ApprovalId) -> Option<ApprovalRequest> {
        self.pending
            .lock()
            .get(approval_id)
            .map(|e| e.request.clone())
    }

    /// Request an approval and suspend until the user resolves it.
    ///
    /// For `plan_approval` with a plan id that already has an in-flight
    /// request, no new request is issued; the caller joins the existing
    /// rendezvous and both callers observe the same resolution.
    pub async fn request_approval(
        &self,
        task_id: TaskId,
        mode: Mode,
        stage: Stage,
        kind: ApprovalKind,
        description: impl Into<String>,
        details: serde_json::Value,
        plan_id: Option<PlanId>,
    ) -> Result<ApprovalResolution, EngineError> {
        let description = description.into();
        let (tx, rx) = oneshot::channel();

        let needs_event = {
            let mut pending = self.pending.lock();

            let existing_id = if kind == ApprovalKind::PlanApproval {
                plan_id.as_ref().and_then(|pid| {
                    pending
                        .iter()
                        .find(|(_, e)| e.request.plan_id.as_ref() == Some(pid))
                        .map(|(id, _)| id.clone())
                })
            } else {
                None
            };

            // Join an in-flight plan approval when one exists
            let mut waiter = Some(tx);
            if let Some(id) = existing_id {
                if let Some(entry) = pending.get_mut(&id) {
                    if let Some(tx) = waiter.take() {
                        entry.waiters.push(tx);
                    }
                }
            }

            match waiter {
                None => None,
                Some(tx) => {
                    let approval_id = ApprovalId::new(format!("ap-{}", self.idgen.next()));
                    let request = ApprovalRequest {
                        approval_id: approval_id.clone(),
                        kind,
                        description: description.clone(),
                        details: details.clone(),
                        plan_id: plan_id.clone(),
                        requested_at: Utc::now(),
                    };
                    pending.insert(
                        approval_id.clone(),
                        PendingEntry {
                            task_id: task_id.clone(),
                            mode,
                            stage,
                            request,
                            waiters: vec![tx],
                        },
                    );
                    Some(approval_id)
                }
            }
        };

        if let Some(approval_id) = needs_event {
            let publish_result = self.publisher.publish(Event::new(
                task_id.clone(),
                mode,
                stage,
                EventKind::ApprovalRequested {
                    approval_id: approval_id.clone(),
                    kind,
                    description,
                    details,
                    plan_id,
                },
            ));
            if let Err(e) = publish_result {
                // The request never became visible; drop the rendezvous.
                self.pending.lock().remove(&approval_id);
                return Err(e);
            }
        }

        rx.await.map_err(|_| EngineError::ApprovalDropped)
    }

    /// Resolve a pending approval, unblocking every waiter.
    ///
    /// Resolving an unknown (or already-resolved) id is a warned no-op, so
    /// double resolution from a racing UI is harmless.
    pub fn resolve_approval(
        &self,
        approval_id: &ApprovalId,
        decision: ApprovalDecision,
        scope: ApprovalScope,
        modified_details: Option<serde_json::Value>,
    ) -> Result<(), EngineError> {
        let Some(entry) = self.pending.lock().remove(approval_id) else {
            warn!(approval_id = %approval_id, "resolve for unknown approval id, ignoring");
            return Ok(());
        };

        self.finish(entry, approval_id, decision, scope, modified_details)
    }

    /// Deny every pending plan approval for a superseded plan.
    pub fn supersede_plan_approvals(&self, old_plan_id: &PlanId) -> Result<(), EngineError> {
        let superseded: Vec<(ApprovalId, PendingEntry)> = {
            let mut pending = self.pending.lock();
            let ids: Vec<ApprovalId> = pending
                .iter()
                .filter(|(_, e)| {
                    e.request.kind == ApprovalKind::PlanApproval
                        && e.request.plan_id.as_ref() == Some(old_plan_id)
                })
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| pending.remove(&id).map(|e| (id, e)))
                .collect()
        };

        for (id, entry) in superseded {
            self.finish(entry, &id, ApprovalDecision::Denied, ApprovalScope::Once, None)?;
        }
        Ok(())
    }

    /// Deny every outstanding approval for a task (task abort).
    pub fn cancel_all_pending(&self, task_id: &TaskId) -> Result<(), EngineError> {
        let cancelled: Vec<(ApprovalId, PendingEntry)> = {
            let mut pending = self.pending.lock();
            let ids: Vec<ApprovalId> = pending
                .iter()
                .filter(|(_, e)| e.task_id == *task_id)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| pending.remove(&id).map(|e| (id, e)))
                .collect()
        };

        for (id, entry) in cancelled {
            self.finish(entry, &id, ApprovalDecision::Denied, ApprovalScope::Once, None)?;
        }
        Ok(())
    }

    /// Rebuild the pending table from unresolved `approval_requested`
    /// events (crash recovery). Rebuilt entries have no waiters; their
    /// resolutions only publish `approval_resolved`.
    pub fn rebuild_from_events(&self, events: &[Event]) {
        let mut pending = self.pending.lock();
        for event in events {
            match event.kind() {
                Some(EventKind::ApprovalRequested {
                    approval_id,
                    kind,
                    description,
                    details,
                    plan_id,
                }) => {
                    pending.insert(
                        approval_id.clone(),
                        PendingEntry {
                            task_id: event.task_id.clone(),
                            mode: event.mode,
                            stage: event.stage,
                            request: ApprovalRequest {
                                approval_id: approval_id.clone(),
                                kind: *kind,
                                description: description.clone(),
                                details: details.clone(),
                                plan_id: plan_id.clone(),
                                requested_at: event.timestamp,
                            },
                            waiters: Vec::new(),
                        },
                    );
                }
                Some(EventKind::ApprovalResolved { approval_id, .. }) => {
                    pending.remove(approval_id);
                }
                _ => {}
            }
        }
    }

    fn finish(
        &self,
        entry: PendingEntry,
        approval_id: &ApprovalId,
        decision: ApprovalDecision,
        scope: ApprovalScope,
        modified_details: Option<serde_json::Value>,
    ) -> Result<(), EngineError> {
        // Publish first so the log shows the resolution before any waiter
        // acts on it.
        self.publisher.publish(Event::new(
            entry.task_id.clone(),
            entry.mode,
            entry.stage,
            EventKind::ApprovalResolved {
                approval_id: approval_id.clone(),
                decision,
                scope,
                modified_details: modified_details.clone(),
            },
        ))?;

        let resolution = ApprovalResolution {
            decision,
            scope,
            resolved_at: Utc::now(),
            modified_details,
        };
        for waiter in entry.waiters {
            // A dropped waiter (cancelled future) is fine
            let _ = waiter.send(resolution.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;
