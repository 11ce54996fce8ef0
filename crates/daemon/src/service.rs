// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The host service: one object wiring the router, lifecycle controllers,
//! approval gate, scope manager, tool executor, and memory together behind
//! the ingress surface the UI calls.
//!
//! All state mutation flows through the bus; the projection is a bus
//! subscriber, so every query observes exactly what the log says.

use crate::config::Config;
use crate::env::StatePaths;
use crate::event_bus::EventBus;
use crate::protocol::{Query, Request, Response};
use crate::recovery::{self, StartupDisposition};
use parking_lot::Mutex;
use pilot_core::{
    normalize_batch, ApprovalDecision, ApprovalId, ApprovalKind, ApprovalResolution,
    ApprovalScope, Behavior, Clock, Event, EventKind, Mode, NormalizedEvent, Plan, PlanId,
    PlanMetadata, ScopeExpansion, Stage, TaskId, TaskState, UuidIdGen,
};
use pilot_core::IdGen;
use pilot_engine::{
    assess_plan, ApprovalManager, EngineError, EventPublisher, LifecycleController,
    MemoryService, PlanSizeReport, PlanningOutcome, RepairTracker, ScopeManager, ToolExecutor,
    ToolHost, ToolInvocation, ToolRunResult,
};
use pilot_intent::{IntentAnalysis, IntentRouter, RouterContext, MAX_CLARIFICATION_ATTEMPTS};
use pilot_storage::{
    ActiveTaskPointer, AppendError, AttachmentStore, CheckpointStore, DecisionKind,
    DecisionRecord, DecisionStore, EventLog, GeneratedToolStore, MemoryStore, PointerError,
    Projection, ProjectionSnapshot, SolutionStore,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("event log error: {0}")]
    Append(#[from] AppendError),
    #[error("pointer error: {0}")]
    Pointer(#[from] PointerError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] pilot_storage::SnapshotError),
    #[error("decision store error: {0}")]
    Decisions(#[from] pilot_storage::DecisionStoreError),
    #[error("unknown task: {0}")]
    UnknownTask(String),
    #[error("unknown scope expansion request: {0}")]
    UnknownExpansion(String),
    #[error("no clarification pending for task {0}")]
    NoPendingClarification(String),
    #[error("generated tool error: {0}")]
    GeneratedTool(#[from] pilot_storage::ToolRegistryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Routed intent plus the task created for it (none for CONTINUE_RUN).
#[derive(Debug, Clone)]
pub struct IntentOutcome {
    pub task_id: Option<TaskId>,
    pub analysis: IntentAnalysis,
}

struct PendingClarification {
    prompt: String,
    attempts: u32,
}

/// The daemon's core object.
pub struct HostService<C: Clock + 'static> {
    paths: StatePaths,
    bus: Arc<EventBus<C>>,
    publisher: Arc<dyn EventPublisher>,
    projection: Arc<Mutex<Projection>>,
    controllers: Mutex<HashMap<String, Arc<AsyncMutex<LifecycleController>>>>,
    active_task: Mutex<Option<TaskId>>,
    approvals: Arc<ApprovalManager>,
    executor: ToolExecutor,
    scopes: ScopeManager,
    memory: MemoryService<C>,
    decisions: DecisionStore,
    repairs: RepairTracker,
    generated_tools: GeneratedToolStore,
    idgen: UuidIdGen,
    pending_clarifications: Mutex<HashMap<String, PendingClarification>>,
    pending_expansions: Arc<Mutex<HashMap<String, (TaskId, ScopeExpansion)>>>,
}

impl<C: Clock + 'static> HostService<C> {
    /// Open the state directory, replay the log (through the snapshot cache
    /// when valid), rebuild pending approvals and expansions, and wire the
    /// projection as a bus subscriber.
    pub fn open(
        paths: StatePaths,
        workspace_root: PathBuf,
        host: Arc<dyn ToolHost>,
        clock: C,
    ) -> Result<Self, ServiceError> {
        std::fs::create_dir_all(&paths.state_dir)?;
        let config = Config::load(&paths.config_path);

        let log = EventLog::open(&paths.events_path)?;
        let bus = Arc::new(EventBus::new(log, clock.clone()));
        let publisher: Arc<dyn EventPublisher> = bus.clone();

        let events = bus.events()?;
        let projection = match ProjectionSnapshot::load(&paths.snapshot_path)? {
            Some(snapshot) if (snapshot.event_count as usize) <= events.len() => {
                let mut p = snapshot.projection;
                for event in events.iter().skip(snapshot.event_count as usize) {
                    p.apply_event(event);
                }
                p
            }
            _ => Projection::reduce(&events),
        };
        let projection = Arc::new(Mutex::new(projection));

        {
            let projection = projection.clone();
            bus.subscribe(Box::new(move |event| {
                projection.lock().apply_event(event);
                Ok(())
            }));
        }

        let pending_expansions: Arc<Mutex<HashMap<String, (TaskId, ScopeExpansion)>>> =
            Arc::new(Mutex::new(HashMap::new()));
        {
            // Keep the expansion table current from the log itself
            let pending = pending_expansions.clone();
            bus.subscribe(Box::new(move |event| {
                match event.kind() {
                    Some(EventKind::ScopeExpansionRequested {
                        request_id,
                        expansion,
                    }) => {
                        pending
                            .lock()
                            .insert(request_id.clone(), (event.task_id.clone(), expansion.clone()));
                    }
                    Some(EventKind::ScopeExpansionResolved { request_id, .. }) => {
                        pending.lock().remove(request_id);
                    }
                    _ => {}
                }
                Ok(())
            }));
        }
        // Seed both tables from history (crash recovery)
        for event in &events {
            match event.kind() {
                Some(EventKind::ScopeExpansionRequested {
                    request_id,
                    expansion,
                }) => {
                    pending_expansions
                        .lock()
                        .insert(request_id.clone(), (event.task_id.clone(), expansion.clone()));
                }
                Some(EventKind::ScopeExpansionResolved { request_id, .. }) => {
                    pending_expansions.lock().remove(request_id);
                }
                _ => {}
            }
        }

        let approvals = Arc::new(ApprovalManager::new(publisher.clone()));
        approvals.rebuild_from_events(&events);

        let mut attachments = AttachmentStore::new(paths.attachments_dir.clone())
            .with_max_bytes(config.attachment_max_bytes);
        if config.attachment_total_cap > 0 {
            attachments = attachments.with_total_cap(config.attachment_total_cap);
        }

        let executor = ToolExecutor::new(
            workspace_root,
            publisher.clone(),
            approvals.clone(),
            ScopeManager::new(publisher.clone()),
            CheckpointStore::new(paths.checkpoints_dir.clone()),
            attachments,
            host,
            UuidIdGen,
        );

        let memory = MemoryService::new(
            MemoryStore::new(paths.memory_dir.clone()),
            SolutionStore::new(paths.solutions_dir.clone()),
            publisher.clone(),
            clock.clone(),
        );

        let decisions = DecisionStore::new(paths.decisions_path.clone());
        let scopes = ScopeManager::new(publisher.clone());
        let repairs = RepairTracker::new(publisher.clone(), config.repair_max_attempts);
        let generated_tools = GeneratedToolStore::new(paths.generated_tools_dir.clone());

        Ok(Self {
            paths,
            bus,
            publisher,
            projection,
            controllers: Mutex::new(HashMap::new()),
            active_task: Mutex::new(None),
            approvals,
            executor,
            scopes,
            memory,
            decisions,
            repairs,
            generated_tools,
            idgen: UuidIdGen,
            pending_clarifications: Mutex::new(HashMap::new()),
            pending_expansions,
        })
    }

    pub fn bus(&self) -> &Arc<EventBus<C>> {
        &self.bus
    }

    pub fn approvals(&self) -> &Arc<ApprovalManager> {
        &self.approvals
    }

    pub fn memory(&self) -> &MemoryService<C> {
        &self.memory
    }

    /// What startup found on disk (crash detection).
    pub fn startup_disposition(&self) -> Result<StartupDisposition, ServiceError> {
        Ok(recovery::detect(&self.paths.active_task_path)?)
    }

    // ── Intent intake ──────────────────────────────────────────────────────

    /// Route a prompt. CONTINUE_RUN returns without creating a task; every
    /// other behavior opens a new task and runs intake on it.
    pub fn submit_intent(
        &self,
        prompt: &str,
        mode_override: Option<Mode>,
    ) -> Result<IntentOutcome, ServiceError> {
        let ctx = self.router_context(0)?;
        let mut analysis = IntentRouter::analyze(prompt, &ctx);

        if let Some(mode) = mode_override {
            let behavior = match mode {
                Mode::Answer => Behavior::Answer,
                Mode::Plan => Behavior::Plan,
                Mode::Mission => Behavior::QuickAction,
            };
            analysis.behavior = behavior;
            analysis.derived_mode = mode;
            analysis.user_override = Some(behavior);
        }

        if analysis.behavior == Behavior::ContinueRun {
            return Ok(IntentOutcome {
                task_id: None,
                analysis,
            });
        }

        let task_id = TaskId::new(format!("task-{}", self.idgen.next()));
        let controller = Arc::new(AsyncMutex::new(LifecycleController::new(
            task_id.clone(),
            self.publisher.clone(),
        )));
        {
            let mut guard = controller
                .try_lock()
                .map_err(|_| ServiceError::UnknownTask(task_id.to_string()))?;
            guard.intake(
                prompt,
                analysis.behavior,
                analysis.confidence,
                Some(format!("{:?}", analysis.context_source)),
                &analysis.reasoning,
            )?;
        }
        self.controllers
            .lock()
            .insert(task_id.as_str().to_string(), controller);
        *self.active_task.lock() = Some(task_id.clone());

        if analysis.behavior == Behavior::Clarify {
            if let Some(clarification) = &analysis.clarification {
                self.publisher.publish(Event::new(
                    task_id.clone(),
                    Mode::Answer,
                    Stage::None,
                    EventKind::ClarificationRequested {
                        question: clarification.question.clone(),
                        options: clarification.options.clone(),
                        attempt: 1,
                    },
                ))?;
            }
            self.pending_clarifications.lock().insert(
                task_id.as_str().to_string(),
                PendingClarification {
                    prompt: prompt.to_string(),
                    attempts: 1,
                },
            );
        }

        self.persist_pointer(&task_id)?;

        Ok(IntentOutcome {
            task_id: Some(task_id),
            analysis,
        })
    }

    /// Re-enter the router with the user's clarification answer.
    pub fn respond_clarification(
        &self,
        task_id: &TaskId,
        response: &str,
    ) -> Result<IntentOutcome, ServiceError> {
        let pending = self
            .pending_clarifications
            .lock()
            .remove(task_id.as_str())
            .ok_or_else(|| ServiceError::NoPendingClarification(task_id.to_string()))?;

        self.publisher.publish(Event::new(
            task_id.clone(),
            Mode::Answer,
            Stage::None,
            EventKind::ClarificationAnswered {
                response: response.to_string(),
                attempt: pending.attempts,
            },
        ))?;

        let combined = format!("{} {}", pending.prompt, response);
        let ctx = self.router_context(pending.attempts)?;
        let analysis = IntentRouter::analyze(&combined, &ctx);

        if analysis.behavior == Behavior::Clarify && pending.attempts < MAX_CLARIFICATION_ATTEMPTS
        {
            if let Some(clarification) = &analysis.clarification {
                self.publisher.publish(Event::new(
                    task_id.clone(),
                    Mode::Answer,
                    Stage::None,
                    EventKind::ClarificationRequested {
                        question: clarification.question.clone(),
                        options: clarification.options.clone(),
                        attempt: pending.attempts + 1,
                    },
                ))?;
            }
            self.pending_clarifications.lock().insert(
                task_id.as_str().to_string(),
                PendingClarification {
                    prompt: combined,
                    attempts: pending.attempts + 1,
                },
            );
        } else if analysis.derived_mode != Mode::Answer {
            // The clarified intent escalates the task's mode
            let controller = self.controller(task_id)?;
            let mut guard = controller
                .try_lock()
                .map_err(|_| ServiceError::UnknownTask(task_id.to_string()))?;
            let change = guard.modes_mut().set_mode(analysis.derived_mode)?;
            if change.changed {
                let shift = change.from_mode.shift_to(change.to_mode);
                self.decisions.append(DecisionRecord {
                    kind: DecisionKind::ModeSwitch,
                    task_id: task_id.clone(),
                    plan_id: None,
                    detail: format!(
                        "{} -> {} ({shift:?})",
                        change.from_mode, change.to_mode
                    ),
                    recorded_at: chrono::Utc::now(),
                })?;
            }
        }

        Ok(IntentOutcome {
            task_id: Some(task_id.clone()),
            analysis,
        })
    }

    // ── Planning ───────────────────────────────────────────────────────────

    /// Publish a plan; runs the large-plan detector and publishes
    /// `plan_large_detected` when it fires.
    pub async fn submit_plan(
        &self,
        task_id: &TaskId,
        plan: Plan,
        metadata: Option<PlanMetadata>,
    ) -> Result<PlanSizeReport, ServiceError> {
        let controller = self.controller(task_id)?;
        let mut guard = controller.lock().await;
        guard.begin_planning(plan.clone())?;

        let report = assess_plan(&plan, metadata.as_ref());
        if report.large {
            self.publisher.publish(Event::new(
                task_id.clone(),
                guard.modes().mode(),
                guard.modes().stage(),
                EventKind::PlanLargeDetected {
                    plan_id: plan.plan_id.clone(),
                    score: report.score,
                    reasons: report.reasons.clone(),
                },
            ))?;
        }
        Ok(report)
    }

    /// Block until the user approves or rejects the plan, then record the
    /// decision. In PLAN mode an approved plan completes the task.
    pub async fn await_plan_approval(
        &self,
        task_id: &TaskId,
        plan_id: &PlanId,
        description: &str,
    ) -> Result<ApprovalResolution, ServiceError> {
        let (mode, stage) = self.mode_and_stage(task_id).await?;
        let resolution = self
            .approvals
            .request_approval(
                task_id.clone(),
                mode,
                stage,
                ApprovalKind::PlanApproval,
                description,
                serde_json::json!({ "plan_id": plan_id }),
                Some(plan_id.clone()),
            )
            .await?;

        let kind = if resolution.is_approved() {
            DecisionKind::PlanApproved
        } else {
            DecisionKind::PlanRejected
        };
        self.decisions.append(DecisionRecord {
            kind,
            task_id: task_id.clone(),
            plan_id: Some(plan_id.clone()),
            detail: description.to_string(),
            recorded_at: chrono::Utc::now(),
        })?;

        if resolution.is_approved() {
            let controller = self.controller(task_id)?;
            let mut guard = controller.lock().await;
            if guard.modes().mode() == Mode::Plan {
                guard.complete_planning()?;
                self.persist_pointer(task_id)?;
            }
        }
        Ok(resolution)
    }

    /// Revise a plan: deny its pending approvals and record the refinement.
    pub fn supersede_plan(
        &self,
        task_id: &TaskId,
        old_plan_id: &PlanId,
    ) -> Result<(), ServiceError> {
        self.approvals.supersede_plan_approvals(old_plan_id)?;
        self.publisher.publish(Event::new(
            task_id.clone(),
            Mode::Plan,
            Stage::None,
            EventKind::PlanSuperseded {
                plan_id: old_plan_id.clone(),
            },
        ))?;
        self.decisions.append(DecisionRecord {
            kind: DecisionKind::PlanRefinement,
            task_id: task_id.clone(),
            plan_id: Some(old_plan_id.clone()),
            detail: "plan revised, previous approvals denied".to_string(),
            recorded_at: chrono::Utc::now(),
        })?;
        Ok(())
    }

    pub async fn complete_planning(
        &self,
        task_id: &TaskId,
    ) -> Result<PlanningOutcome, ServiceError> {
        let controller = self.controller(task_id)?;
        let outcome = controller.lock().await.complete_planning()?;
        self.persist_pointer(task_id)?;
        Ok(outcome)
    }

    // ── Mission / staged execution ─────────────────────────────────────────

    pub async fn start_mission(
        &self,
        task_id: &TaskId,
        title: Option<String>,
    ) -> Result<(), ServiceError> {
        let controller = self.controller(task_id)?;
        controller.lock().await.start_mission(title)?;
        Ok(())
    }

    pub async fn enter_stage(&self, task_id: &TaskId, stage: Stage) -> Result<(), ServiceError> {
        let controller = self.controller(task_id)?;
        controller.lock().await.enter_stage(stage)?;
        self.persist_pointer(task_id)?;
        Ok(())
    }

    /// Run one tool invocation through the executor gate.
    ///
    /// The controller lock is not held across the run: the executor gets a
    /// snapshot of the permission envelope, so pause/stop and approval
    /// resolution stay responsive while a tool waits on the user.
    pub async fn execute_tool(
        &self,
        task_id: &TaskId,
        invocation: ToolInvocation,
    ) -> Result<ToolRunResult, ServiceError> {
        let modes = {
            let controller = self.controller(task_id)?;
            let guard = controller.lock().await;
            let mut snapshot = pilot_engine::ModeManager::new(
                task_id.clone(),
                guard.modes().mode(),
                self.publisher.clone(),
            );
            snapshot.adopt_stage(guard.modes().stage());
            snapshot
        };
        let summary = self
            .projection
            .lock()
            .task(task_id.as_str())
            .map(|t| t.scope_summary.clone())
            .unwrap_or_default();
        Ok(self.executor.run(&modes, &summary, invocation).await?)
    }

    /// Start the next bounded repair attempt; on an exhausted budget the
    /// tracker escalates to a blocking decision point and this fails.
    pub async fn begin_repair_attempt(&self, task_id: &TaskId) -> Result<u32, ServiceError> {
        self.enter_stage(task_id, Stage::Repair).await?;
        Ok(self.repairs.begin_attempt(task_id)?)
    }

    /// Record a successful repair round.
    pub fn complete_repair(&self, task_id: &TaskId) -> Result<(), ServiceError> {
        self.repairs.succeed(task_id)?;
        Ok(())
    }

    /// Register a generated tool after the user approves its code. The
    /// registry keeps a sha-256 of the approved source; a later mismatch
    /// blocks the tool until re-approved.
    pub async fn register_generated_tool(
        &self,
        task_id: &TaskId,
        name: &str,
        code: &str,
    ) -> Result<(), ServiceError> {
        let (mode, stage) = self.mode_and_stage(task_id).await?;
        let resolution = self
            .approvals
            .request_approval(
                task_id.clone(),
                mode,
                stage,
                ApprovalKind::GeneratedTool,
                format!("register generated tool {name}"),
                serde_json::json!({ "name": name, "code": code }),
                None,
            )
            .await?;
        if !resolution.is_approved() {
            return Err(ServiceError::Engine(EngineError::ApprovalDenied {
                description: format!("generated tool {name}"),
            }));
        }

        let entry = self.generated_tools.register(name, code)?;
        self.publisher.publish(Event::new(
            task_id.clone(),
            mode,
            stage,
            EventKind::GeneratedToolRegistered {
                name: entry.name,
                sha256: entry.sha256,
            },
        ))?;
        Ok(())
    }

    /// Gate one run of a registered tool: approval first, then a verified
    /// load (hash must still match the approved code).
    pub async fn load_generated_tool(
        &self,
        task_id: &TaskId,
        name: &str,
    ) -> Result<String, ServiceError> {
        let (mode, stage) = self.mode_and_stage(task_id).await?;
        let resolution = self
            .approvals
            .request_approval(
                task_id.clone(),
                mode,
                stage,
                ApprovalKind::GeneratedToolRun,
                format!("run generated tool {name}"),
                serde_json::json!({ "name": name }),
                None,
            )
            .await?;
        if !resolution.is_approved() {
            return Err(ServiceError::Engine(EngineError::ApprovalDenied {
                description: format!("generated tool {name}"),
            }));
        }
        Ok(self.generated_tools.load_verified(name)?)
    }

    pub async fn complete_mission(&self, task_id: &TaskId) -> Result<(), ServiceError> {
        let controller = self.controller(task_id)?;
        controller.lock().await.complete_mission()?;
        Ok(())
    }

    pub async fn finish(
        &self,
        task_id: &TaskId,
        summary: Option<String>,
    ) -> Result<(), ServiceError> {
        let controller = self.controller(task_id)?;
        controller.lock().await.finish(summary)?;
        self.persist_pointer(task_id)?;
        Ok(())
    }

    // ── Pause / resume / stop ──────────────────────────────────────────────

    pub async fn pause(&self, task_id: &TaskId) -> Result<(), ServiceError> {
        let controller = self.controller(task_id)?;
        controller.lock().await.pause()?;
        self.persist_pointer(task_id)?;
        Ok(())
    }

    pub async fn resume(&self, task_id: &TaskId) -> Result<(), ServiceError> {
        let controller = self.controller(task_id)?;
        controller.lock().await.resume()?;
        self.persist_pointer(task_id)?;
        Ok(())
    }

    /// Stop the task and deny everything still waiting on the user.
    pub async fn stop(&self, task_id: &TaskId, reason: Option<String>) -> Result<(), ServiceError> {
        self.approvals.cancel_all_pending(task_id)?;
        self.repairs.clear(task_id);
        let controller = self.controller(task_id)?;
        controller.lock().await.stop(reason)?;
        self.persist_pointer(task_id)?;
        Ok(())
    }

    /// Cancel a running mission (user abort): terminal marker, then stop.
    pub async fn cancel_mission(
        &self,
        task_id: &TaskId,
        reason: Option<String>,
    ) -> Result<(), ServiceError> {
        self.approvals.cancel_all_pending(task_id)?;
        let controller = self.controller(task_id)?;
        let mut guard = controller.lock().await;
        guard.cancel_mission(reason.clone())?;
        guard.stop(reason)?;
        drop(guard);
        self.persist_pointer(task_id)?;
        Ok(())
    }

    // ── Approvals & scope ──────────────────────────────────────────────────

    pub fn resolve_approval(
        &self,
        approval_id: &ApprovalId,
        decision: ApprovalDecision,
        scope: ApprovalScope,
        modified_details: Option<serde_json::Value>,
    ) -> Result<(), ServiceError> {
        self.approvals
            .resolve_approval(approval_id, decision, scope, modified_details)?;
        Ok(())
    }

    /// Resolve a pending scope expansion; on approval the reducer widens
    /// the contract and an identical retry will pass.
    pub async fn resolve_scope_expansion(
        &self,
        request_id: &str,
        approved: bool,
    ) -> Result<(), ServiceError> {
        let (task_id, expansion) = self
            .pending_expansions
            .lock()
            .get(request_id)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownExpansion(request_id.to_string()))?;

        let (mode, stage) = self.mode_and_stage(&task_id).await?;
        self.scopes.resolve_expansion(
            task_id,
            mode,
            stage,
            request_id.to_string(),
            approved,
            &expansion,
        )?;
        Ok(())
    }

    // ── Crash recovery ─────────────────────────────────────────────────────

    /// Resume the interrupted task after a crash.
    pub async fn recover_task(&self, task_id: &TaskId) -> Result<(), ServiceError> {
        let controller = self.controller(task_id)?;
        controller.lock().await.recover()?;
        *self.active_task.lock() = Some(task_id.clone());
        self.persist_pointer(task_id)?;
        Ok(())
    }

    /// Discard the interrupted task after a crash.
    pub async fn discard_task(&self, task_id: &TaskId) -> Result<(), ServiceError> {
        self.approvals.cancel_all_pending(task_id)?;
        self.repairs.clear(task_id);
        let controller = self.controller(task_id)?;
        controller.lock().await.discard()?;
        *self.active_task.lock() = None;
        ActiveTaskPointer::clear(&self.paths.active_task_path)?;
        Ok(())
    }

    /// Orderly shutdown: snapshot the projection and stamp the clean exit.
    pub fn mark_clean_exit(&self) -> Result<(), ServiceError> {
        let event_count = self.bus.events()?.len() as u64;
        let projection = self.projection.lock().clone();
        ProjectionSnapshot::new(event_count, projection).save(&self.paths.snapshot_path)?;
        ActiveTaskPointer::mark_clean_exit(&self.paths.active_task_path)?;
        info!("clean exit recorded");
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────────────────

    pub fn task_state(&self, task_id: &TaskId) -> TaskState {
        self.projection
            .lock()
            .task(task_id.as_str())
            .cloned()
            .unwrap_or_else(|| TaskState::new(task_id.clone()))
    }

    pub fn events_for_task(&self, task_id: &TaskId) -> Result<Vec<Event>, ServiceError> {
        Ok(self.bus.events_for_task(task_id.as_str())?)
    }

    pub fn normalized_events_for_task(
        &self,
        task_id: &TaskId,
    ) -> Result<Vec<NormalizedEvent>, ServiceError> {
        Ok(normalize_batch(&self.bus.events_for_task(task_id.as_str())?))
    }

    // ── Protocol dispatch ──────────────────────────────────────────────────

    /// Handle one protocol request; errors become `Response::Error`.
    pub async fn handle_request(&self, request: Request) -> Response {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        }
    }

    async fn dispatch(&self, request: Request) -> Result<Response, ServiceError> {
        match request {
            Request::Ping => Ok(Response::Pong),
            Request::SubmitIntent {
                prompt,
                mode_override,
                ..
            } => {
                let outcome = self.submit_intent(&prompt, mode_override)?;
                Ok(Response::Intent {
                    analysis: outcome.analysis,
                })
            }
            Request::ClarificationResponse { task_id, response } => {
                let outcome = self.respond_clarification(&task_id, &response)?;
                Ok(Response::Intent {
                    analysis: outcome.analysis,
                })
            }
            Request::ResolveApproval {
                approval_id,
                decision,
                scope,
                modified_details,
            } => {
                self.resolve_approval(&approval_id, decision, scope, modified_details)?;
                Ok(Response::Ack)
            }
            Request::ResolveScopeExpansion {
                request_id,
                approved,
            } => {
                self.resolve_scope_expansion(&request_id, approved).await?;
                Ok(Response::Ack)
            }
            Request::SupersedePlan { task_id, plan_id } => {
                self.supersede_plan(&task_id, &plan_id)?;
                Ok(Response::Ack)
            }
            Request::Pause { task_id } => {
                self.pause(&task_id).await?;
                Ok(Response::Ack)
            }
            Request::Resume { task_id } => {
                self.resume(&task_id).await?;
                Ok(Response::Ack)
            }
            Request::Stop { task_id } => {
                self.stop(&task_id, None).await?;
                Ok(Response::Ack)
            }
            Request::RecoverTask { task_id } => {
                self.recover_task(&task_id).await?;
                Ok(Response::Ack)
            }
            Request::DiscardTask { task_id } => {
                self.discard_task(&task_id).await?;
                Ok(Response::Ack)
            }
            Request::Query { query } => self.query(query),
            Request::Shutdown => {
                self.mark_clean_exit()?;
                Ok(Response::Ack)
            }
        }
    }

    fn query(&self, query: Query) -> Result<Response, ServiceError> {
        match query {
            Query::TaskState { task_id } => Ok(Response::TaskState {
                state: self.task_state(&task_id),
            }),
            Query::Events { task_id } => Ok(Response::Events {
                events: self.events_for_task(&task_id)?,
            }),
            Query::NormalizedEvents { task_id } => Ok(Response::NormalizedEvents {
                events: self.normalized_events_for_task(&task_id)?,
            }),
            Query::PendingApprovals => Ok(Response::PendingApprovals {
                approval_ids: self.approvals.pending_ids(),
            }),
        }
    }

    // ── Internals ──────────────────────────────────────────────────────────

    /// Build the router context from the active task's history.
    fn router_context(&self, clarification_attempts: u32) -> Result<RouterContext, ServiceError> {
        let active = self.active_task.lock().clone();
        let recent_events = match &active {
            Some(task_id) => self.bus.events_for_task(task_id.as_str())?,
            None => Vec::new(),
        };

        let last_applied_diff = recent_events.iter().rev().find_map(|e| match e.kind() {
            Some(EventKind::DiffApplied { files, .. }) => Some(files.clone()),
            _ => None,
        });
        let last_artifact_proposed = recent_events.iter().rev().find_map(|e| match e.kind() {
            Some(EventKind::ArtifactProposed { files, .. }) => Some(files.clone()),
            _ => None,
        });

        Ok(RouterContext {
            recent_events,
            clarification_attempts,
            last_applied_diff,
            last_open_editor: None,
            last_artifact_proposed,
        })
    }

    /// Controller for a task, rebuilding from the projection after restart.
    fn controller(
        &self,
        task_id: &TaskId,
    ) -> Result<Arc<AsyncMutex<LifecycleController>>, ServiceError> {
        if let Some(controller) = self.controllers.lock().get(task_id.as_str()) {
            return Ok(controller.clone());
        }

        let state = self
            .projection
            .lock()
            .task(task_id.as_str())
            .cloned()
            .ok_or_else(|| ServiceError::UnknownTask(task_id.to_string()))?;

        let controller = Arc::new(AsyncMutex::new(LifecycleController::restore(
            task_id.clone(),
            self.publisher.clone(),
            state.mode,
            state.stage,
            state.status,
        )));
        self.controllers
            .lock()
            .insert(task_id.as_str().to_string(), controller.clone());
        Ok(controller)
    }

    async fn mode_and_stage(&self, task_id: &TaskId) -> Result<(Mode, Stage), ServiceError> {
        let controller = self.controller(task_id)?;
        let guard = controller.lock().await;
        Ok((guard.modes().mode(), guard.modes().stage()))
    }

    fn persist_pointer(&self, task_id: &TaskId) -> Result<(), ServiceError> {
        let state = self.task_state(task_id);
        ActiveTaskPointer::new(task_id.clone(), state.mode, state.stage, state.status)
            .save(&self.paths.active_task_path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
