// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pilot_core::{FakeClock, TaskStatus, ToolAction};
use pilot_engine::FakeToolHost;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    paths: StatePaths,
    workspace: PathBuf,
    clock: FakeClock,
    service: HostService<FakeClock>,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let paths = StatePaths::under(dir.path().join("state"));
    let workspace = dir.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();

    let clock = FakeClock::new();
    clock.set_epoch_ms(1_767_009_600_000);

    let service = HostService::open(
        paths.clone(),
        workspace.clone(),
        Arc::new(FakeToolHost::new()),
        clock.clone(),
    )
    .unwrap();

    Fixture {
        paths,
        workspace,
        clock,
        service,
        _dir: dir,
    }
}

fn reopen(fx: &Fixture) -> HostService<FakeClock> {
    HostService::open(
        fx.paths.clone(),
        fx.workspace.clone(),
        Arc::new(FakeToolHost::new()),
        fx.clock.clone(),
    )
    .unwrap()
}

fn write_workspace_file(workspace: &Path, rel: &str, content: &str) {
    let path = workspace.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

// ── Intent intake ───────────────────────────────────────────────────────────

#[tokio::test]
async fn pure_question_creates_answer_task_with_no_tool_events() {
    let fx = fixture();
    let outcome = fx
        .service
        .submit_intent("What is dependency injection?", None)
        .unwrap();

    assert_eq!(outcome.analysis.behavior, Behavior::Answer);
    assert!(outcome.analysis.confidence >= 0.8);

    let task_id = outcome.task_id.unwrap();
    let events = fx.service.events_for_task(&task_id).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].type_name(), "intent_received");
    assert_eq!(fx.service.task_state(&task_id).status, TaskStatus::Running);
}

#[tokio::test]
async fn mode_override_coerces_behavior() {
    let fx = fixture();
    let outcome = fx
        .service
        .submit_intent("What is dependency injection?", Some(Mode::Plan))
        .unwrap();
    assert_eq!(outcome.analysis.behavior, Behavior::Plan);
    assert_eq!(outcome.analysis.derived_mode, Mode::Plan);
}

#[tokio::test]
async fn ambiguous_prompt_opens_clarification_loop() {
    let fx = fixture();
    let outcome = fx.service.submit_intent("Fix this", None).unwrap();
    let task_id = outcome.task_id.unwrap();

    assert_eq!(outcome.analysis.behavior, Behavior::Clarify);
    let events = fx.service.events_for_task(&task_id).unwrap();
    assert!(events
        .iter()
        .any(|e| e.type_name() == "clarification_requested"));

    // Answering with a concrete file resolves on re-entry
    let second = fx
        .service
        .respond_clarification(&task_id, "the typo in src/index.ts")
        .unwrap();
    assert_eq!(second.analysis.behavior, Behavior::QuickAction);
    assert_eq!(
        second.analysis.referenced_files,
        vec![PathBuf::from("src/index.ts")]
    );

    let events = fx.service.events_for_task(&task_id).unwrap();
    assert!(events
        .iter()
        .any(|e| e.type_name() == "clarification_answered"));
    // Mode escalated to MISSION and was audited
    assert!(events.iter().any(|e| e.type_name() == "mode_changed"));
}

#[tokio::test]
async fn clarification_response_without_pending_fails() {
    let fx = fixture();
    let err = fx
        .service
        .respond_clarification(&TaskId::new("task-ghost"), "answer")
        .unwrap_err();
    assert!(matches!(err, ServiceError::NoPendingClarification(_)));
}

#[tokio::test]
async fn unresolved_approval_routes_next_prompt_to_continue_run() {
    let fx = fixture();
    let outcome = fx.service.submit_intent("run the tests", None).unwrap();
    let task_id = outcome.task_id.unwrap();

    fx.service
        .enter_stage(&task_id, Stage::Command)
        .await
        .unwrap();

    // Kick off an exec tool; it blocks on terminal approval
    let invocation = ToolInvocation {
        tool: "execute_command".to_string(),
        action: ToolAction::ExecuteCommand,
        files: vec![],
        inputs: json!({ "command": "npm test" }),
        lines: 0,
    };
    let run = fx.service.execute_tool(&task_id, invocation);
    tokio::pin!(run);

    // Drive the run future until the approval is registered
    loop {
        tokio::select! {
            biased;
            _ = &mut run => panic!("tool should be blocked on approval"),
            _ = tokio::task::yield_now() => {
                if !fx.service.approvals().pending_ids().is_empty() {
                    break;
                }
            }
        }
    }

    let outcome = fx.service.submit_intent("keep going", None).unwrap();
    assert_eq!(outcome.analysis.behavior, Behavior::ContinueRun);
    assert!(outcome.task_id.is_none());

    // Clean up: deny the approval so the tool future resolves
    let id = fx.service.approvals().pending_ids().remove(0);
    fx.service
        .resolve_approval(&id, ApprovalDecision::Denied, ApprovalScope::Once, None)
        .unwrap();
    let result = run.await;
    assert!(result.is_err());
}

// ── Scope expansion round trip ──────────────────────────────────────────────

#[tokio::test]
async fn blocked_read_expands_scope_then_succeeds() {
    let fx = fixture();
    let outcome = fx.service.submit_intent("run the tests", None).unwrap();
    let task_id = outcome.task_id.unwrap();

    // Plan pins the contract to a single file
    let plan = pilot_core::test_support::plan_with_contract(
        "plan-1",
        &["a.ts"],
        pilot_core::ScopeContract::default(),
    );
    fx.service
        .submit_plan(&task_id, plan, None)
        .await
        .unwrap();

    let read_b = ToolInvocation {
        tool: "read_file".to_string(),
        action: ToolAction::ReadFile,
        files: vec![PathBuf::from("b.ts")],
        inputs: json!({ "path": "b.ts" }),
        lines: 10,
    };

    let err = fx
        .service
        .execute_tool(&task_id, read_b.clone())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Engine(EngineError::ScopeBlocked { .. })
    ));

    // The expansion request is on the log with low impact
    let events = fx.service.events_for_task(&task_id).unwrap();
    let request_id = events
        .iter()
        .find_map(|e| match e.kind() {
            Some(EventKind::ScopeExpansionRequested {
                request_id,
                expansion,
            }) => {
                assert_eq!(expansion.impact_level, pilot_core::ImpactLevel::Low);
                Some(request_id.clone())
            }
            _ => None,
        })
        .unwrap();

    fx.service
        .resolve_scope_expansion(&request_id, true)
        .await
        .unwrap();

    // Contract widened: 1 + 1 new file
    let state = fx.service.task_state(&task_id);
    let contract = state.scope_summary.contract.as_ref().unwrap();
    assert_eq!(contract.max_files, 2);
    assert!(state
        .scope_summary
        .in_scope_files
        .contains(&PathBuf::from("b.ts")));

    // The identical request now passes
    fx.service.execute_tool(&task_id, read_b).await.unwrap();
}

#[tokio::test]
async fn resolving_unknown_expansion_fails() {
    let fx = fixture();
    let err = fx
        .service
        .resolve_scope_expansion("sx-ghost", true)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::UnknownExpansion(_)));
}

// ── Pause / resume / stop ───────────────────────────────────────────────────

#[tokio::test]
async fn pause_resume_stop_update_projection() {
    let fx = fixture();
    let task_id = fx
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();

    fx.service.pause(&task_id).await.unwrap();
    assert_eq!(fx.service.task_state(&task_id).status, TaskStatus::Paused);

    fx.service.resume(&task_id).await.unwrap();
    assert_eq!(fx.service.task_state(&task_id).status, TaskStatus::Running);

    fx.service.stop(&task_id, None).await.unwrap();
    assert_eq!(fx.service.task_state(&task_id).status, TaskStatus::Idle);
}

// ── Crash recovery ──────────────────────────────────────────────────────────

#[tokio::test]
async fn replay_after_restart_matches_in_memory_state() {
    let fx = fixture();
    let task_id = fx
        .service
        .submit_intent("Fix typo in src/index.ts", None)
        .unwrap()
        .task_id
        .unwrap();
    fx.service
        .enter_stage(&task_id, Stage::Edit)
        .await
        .unwrap();

    let before = fx.service.task_state(&task_id);

    let reopened = reopen(&fx);
    let after = reopened.task_state(&task_id);
    assert_eq!(before, after);
}

#[tokio::test]
async fn unclean_shutdown_offers_recovery_then_resume_works() {
    let fx = fixture();
    let task_id = fx
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();
    fx.service.pause(&task_id).await.unwrap();

    // No mark_clean_exit: simulate a crash by just reopening
    let reopened = reopen(&fx);
    match reopened.startup_disposition().unwrap() {
        StartupDisposition::RecoveryOffer(pointer) => {
            assert_eq!(pointer.task_id, task_id);
        }
        other => panic!("expected recovery offer, got {other:?}"),
    }

    reopened.recover_task(&task_id).await.unwrap();
    assert_eq!(reopened.task_state(&task_id).status, TaskStatus::Running);
    assert!(reopened
        .events_for_task(&task_id)
        .unwrap()
        .iter()
        .any(|e| e.type_name() == "task_recovery_started"));
}

#[tokio::test]
async fn clean_shutdown_is_not_a_recovery_offer() {
    let fx = fixture();
    let task_id = fx
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();
    fx.service.stop(&task_id, None).await.unwrap();
    fx.service.mark_clean_exit().unwrap();

    let reopened = reopen(&fx);
    assert!(matches!(
        reopened.startup_disposition().unwrap(),
        StartupDisposition::CleanExit(_)
    ));
}

#[tokio::test]
async fn discard_clears_the_pointer() {
    let fx = fixture();
    let task_id = fx
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();

    fx.service.discard_task(&task_id).await.unwrap();
    assert!(matches!(
        fx.service.startup_disposition().unwrap(),
        StartupDisposition::Fresh
    ));
    assert_eq!(fx.service.task_state(&task_id).status, TaskStatus::Idle);
}

// ── Plan flow ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn large_plan_is_flagged_on_the_log() {
    let fx = fixture();
    let task_id = fx
        .service
        .submit_intent("Create a new React application from scratch", None)
        .unwrap()
        .task_id
        .unwrap();

    let steps: Vec<pilot_core::PlanStep> = (0..16)
        .map(|i| pilot_core::PlanStep::new(format!("implement module {i}")))
        .collect();
    let plan = Plan {
        plan_id: PlanId::new("plan-big"),
        title: "greenfield app".to_string(),
        steps,
        scope_contract: None,
        in_scope_files: Vec::new(),
    };

    let report = fx.service.submit_plan(&task_id, plan, None).await.unwrap();
    assert!(report.large);

    let events = fx.service.events_for_task(&task_id).unwrap();
    assert!(events.iter().any(|e| e.type_name() == "plan_large_detected"));
}

#[tokio::test]
async fn approved_plan_in_plan_mode_completes_the_task() {
    let fx = fixture();
    let task_id = fx
        .service
        .submit_intent("design a migration plan and roadmap for billing", None)
        .unwrap()
        .task_id
        .unwrap();
    assert_eq!(fx.service.task_state(&task_id).mode, Mode::Plan);

    let plan = pilot_core::test_support::plan_with_contract(
        "plan-1",
        &["billing.ts"],
        pilot_core::ScopeContract::default(),
    );
    fx.service
        .submit_plan(&task_id, plan, None)
        .await
        .unwrap();

    let plan_id = PlanId::new("plan-1");
    let approval = fx
        .service
        .await_plan_approval(&task_id, &plan_id, "approve the plan");
    tokio::pin!(approval);

    loop {
        tokio::select! {
            biased;
            resolution = &mut approval => {
                let resolution = resolution.unwrap();
                assert!(resolution.is_approved());
                break;
            }
            _ = tokio::task::yield_now() => {
                let mut pending = fx.service.approvals().pending_ids();
                if let Some(id) = pending.pop() {
                    fx.service
                        .resolve_approval(&id, ApprovalDecision::Approved, ApprovalScope::Once, None)
                        .unwrap();
                }
            }
        }
    }

    assert_eq!(fx.service.task_state(&task_id).status, TaskStatus::Complete);
    let events = fx.service.events_for_task(&task_id).unwrap();
    assert_eq!(events.last().unwrap().type_name(), "final");
}

// ── Repair loop ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn repair_exhaustion_escalates_to_a_blocking_decision_point() {
    let fx = fixture();
    let task_id = fx
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();

    // Default budget is three attempts
    for expected in 1..=3 {
        let attempt = fx.service.begin_repair_attempt(&task_id).await.unwrap();
        assert_eq!(attempt, expected);
    }

    let err = fx.service.begin_repair_attempt(&task_id).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Engine(EngineError::RepairExhausted { attempts: 3 })
    ));

    let events = fx.service.events_for_task(&task_id).unwrap();
    assert!(events.iter().any(|e| e.type_name() == "repair_exhausted"));
    let decision = events
        .iter()
        .find(|e| e.type_name() == "decision_point_needed")
        .unwrap();
    match decision.kind().unwrap() {
        EventKind::DecisionPointNeeded { blocking, .. } => assert!(*blocking),
        other => panic!("unexpected kind {other:?}"),
    }

    // The unresolved blocking decision point makes the run active
    let outcome = fx.service.submit_intent("what now", None).unwrap();
    assert_eq!(outcome.analysis.behavior, Behavior::ContinueRun);
}

#[tokio::test]
async fn repair_iteration_is_visible_in_task_state() {
    let fx = fixture();
    let task_id = fx
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();

    fx.service.begin_repair_attempt(&task_id).await.unwrap();
    fx.service.begin_repair_attempt(&task_id).await.unwrap();

    let state = fx.service.task_state(&task_id);
    assert_eq!(state.iteration.current, 2);
    assert_eq!(state.iteration.max, 3);
}

// ── Generated tools ─────────────────────────────────────────────────────────

#[tokio::test]
async fn generated_tool_registration_is_approval_gated() {
    let fx = fixture();
    let task_id = fx
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();

    let register = fx
        .service
        .register_generated_tool(&task_id, "count-lines", "exports.run = () => 42;");
    tokio::pin!(register);

    loop {
        tokio::select! {
            biased;
            result = &mut register => {
                result.unwrap();
                break;
            }
            _ = tokio::task::yield_now() => {
                let mut pending = fx.service.approvals().pending_ids();
                if let Some(id) = pending.pop() {
                    fx.service
                        .resolve_approval(&id, ApprovalDecision::Approved, ApprovalScope::Once, None)
                        .unwrap();
                }
            }
        }
    }

    let events = fx.service.events_for_task(&task_id).unwrap();
    assert!(events
        .iter()
        .any(|e| e.type_name() == "generated_tool_registered"));

    // Loading for a run takes a second approval
    let load = fx.service.load_generated_tool(&task_id, "count-lines");
    tokio::pin!(load);
    loop {
        tokio::select! {
            biased;
            result = &mut load => {
                assert_eq!(result.unwrap(), "exports.run = () => 42;");
                break;
            }
            _ = tokio::task::yield_now() => {
                let mut pending = fx.service.approvals().pending_ids();
                if let Some(id) = pending.pop() {
                    fx.service
                        .resolve_approval(&id, ApprovalDecision::Approved, ApprovalScope::Once, None)
                        .unwrap();
                }
            }
        }
    }
}

#[tokio::test]
async fn denied_generated_tool_is_not_registered() {
    let fx = fixture();
    let task_id = fx
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();

    let register = fx
        .service
        .register_generated_tool(&task_id, "sneaky", "exports.run = () => {};");
    tokio::pin!(register);

    loop {
        tokio::select! {
            biased;
            result = &mut register => {
                assert!(result.is_err());
                break;
            }
            _ = tokio::task::yield_now() => {
                let mut pending = fx.service.approvals().pending_ids();
                if let Some(id) = pending.pop() {
                    fx.service
                        .resolve_approval(&id, ApprovalDecision::Denied, ApprovalScope::Once, None)
                        .unwrap();
                }
            }
        }
    }

    let events = fx.service.events_for_task(&task_id).unwrap();
    assert!(!events
        .iter()
        .any(|e| e.type_name() == "generated_tool_registered"));
}

// ── Trivial fix end to end (checkpoint → approval → diff) ───────────────────

#[tokio::test]
async fn trivial_fix_checkpoints_and_applies_after_approval() {
    let fx = fixture();
    write_workspace_file(&fx.workspace, "src/index.ts", "teh typo");

    let outcome = fx
        .service
        .submit_intent("Fix typo in src/index.ts", None)
        .unwrap();
    let task_id = outcome.task_id.unwrap();
    assert_eq!(outcome.analysis.behavior, Behavior::QuickAction);

    fx.service
        .start_mission(&task_id, Some("fix typo".into()))
        .await
        .unwrap();
    fx.service.enter_stage(&task_id, Stage::Edit).await.unwrap();

    let invocation = ToolInvocation {
        tool: "apply_diff".to_string(),
        action: ToolAction::WriteFile,
        files: vec![PathBuf::from("src/index.ts")],
        inputs: json!({ "path": "src/index.ts" }),
        lines: 0,
    };
    let run = fx.service.execute_tool(&task_id, invocation);
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            biased;
            result = &mut run => break result,
            _ = tokio::task::yield_now() => {
                let mut pending = fx.service.approvals().pending_ids();
                if let Some(id) = pending.pop() {
                    fx.service
                        .resolve_approval(&id, ApprovalDecision::Approved, ApprovalScope::Once, None)
                        .unwrap();
                }
            }
        }
    };
    result.unwrap();

    let names: Vec<String> = fx
        .service
        .events_for_task(&task_id)
        .unwrap()
        .iter()
        .map(|e| e.type_name().to_string())
        .collect();

    let pos = |name: &str| names.iter().position(|n| n == name).unwrap();
    assert!(pos("checkpoint_created") < pos("approval_requested"));
    assert!(pos("approval_requested") < pos("approval_resolved"));
    assert!(pos("approval_resolved") < pos("tool_end"));
    assert!(pos("tool_end") < pos("diff_applied"));

    // The projection saw the write land
    let state = fx.service.task_state(&task_id);
    assert!(state
        .scope_summary
        .tools_used
        .contains(&pilot_core::ToolClass::Write));
}
