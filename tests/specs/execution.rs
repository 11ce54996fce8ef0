//! Staged execution: the approval/checkpoint pipeline and mode enforcement.

use crate::prelude::*;
use pilot_core::{ApprovalDecision, EventKind, Stage, TaskStatus, ToolAction};
use pilot_engine::{EngineError, ToolInvocation};
use pilot_daemon::ServiceError;
use serde_json::json;
use std::path::PathBuf;

fn diff_invocation(file: &str) -> ToolInvocation {
    ToolInvocation {
        tool: "apply_diff".to_string(),
        action: ToolAction::WriteFile,
        files: vec![PathBuf::from(file)],
        inputs: json!({ "path": file }),
        lines: 0,
    }
}

#[tokio::test]
async fn trivial_fix_pipeline_checkpoint_approval_diff() {
    let specs = specs();
    write_file(&specs.workspace, "src/index.ts", "teh typo");

    let task_id = specs
        .service
        .submit_intent("Fix typo in src/index.ts", None)
        .unwrap()
        .task_id
        .unwrap();
    specs
        .service
        .start_mission(&task_id, Some("fix typo".into()))
        .await
        .unwrap();
    specs
        .service
        .enter_stage(&task_id, Stage::Edit)
        .await
        .unwrap();

    let result = drive_resolving_approvals(
        &specs,
        specs.service.execute_tool(&task_id, diff_invocation("src/index.ts")),
        ApprovalDecision::Approved,
    )
    .await;
    result.unwrap();

    let names = event_names(&specs, &task_id);
    let pos = |name: &str| names.iter().position(|n| n == name).unwrap();
    assert!(pos("checkpoint_created") < pos("approval_requested"));
    assert!(pos("approval_requested") < pos("approval_resolved"));
    assert!(pos("approval_resolved") < pos("diff_applied"));
}

#[tokio::test]
async fn write_in_answer_mode_is_rejected_with_one_violation() {
    let specs = specs();
    let task_id = specs
        .service
        .submit_intent("What is dependency injection?", None)
        .unwrap()
        .task_id
        .unwrap();

    let err = specs
        .service
        .execute_tool(&task_id, diff_invocation("src/index.ts"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Engine(EngineError::ModeViolation { .. })
    ));
    let names = event_names(&specs, &task_id);
    assert_eq!(names.iter().filter(|n| *n == "mode_violation").count(), 1);
    assert!(!names.iter().any(|n| n == "diff_applied"));
}

#[tokio::test]
async fn every_tool_end_is_parented_to_a_prior_tool_start() {
    let specs = specs();
    let task_id = specs
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();
    specs
        .service
        .enter_stage(&task_id, Stage::Command)
        .await
        .unwrap();

    let run = drive_resolving_approvals(
        &specs,
        specs.service.execute_tool(
            &task_id,
            ToolInvocation {
                tool: "npm test".to_string(),
                action: ToolAction::ExecuteCommand,
                files: vec![],
                inputs: json!({ "command": "npm test" }),
                lines: 0,
            },
        ),
        ApprovalDecision::Approved,
    )
    .await;
    run.unwrap();

    let events = specs.service.events_for_task(&task_id).unwrap();
    let mut start_ids = Vec::new();
    for event in &events {
        match event.kind() {
            Some(EventKind::ToolStart { .. }) => start_ids.push(event.event_id.clone()),
            Some(EventKind::ToolEnd { .. }) => {
                let parent = event.parent_event_id.as_ref().unwrap();
                assert!(start_ids.contains(parent));
            }
            _ => {}
        }
    }
    // A completed command is a terminal marker for the active-run detector
    assert!(events.iter().any(|e| e.type_name() == "command_completed"));
}

#[tokio::test]
async fn denied_approval_restores_and_reports_cancelled() {
    let specs = specs();
    write_file(&specs.workspace, "src/index.ts", "original");

    let task_id = specs
        .service
        .submit_intent("Fix typo in src/index.ts", None)
        .unwrap()
        .task_id
        .unwrap();
    specs
        .service
        .enter_stage(&task_id, Stage::Edit)
        .await
        .unwrap();

    let result = drive_resolving_approvals(
        &specs,
        specs.service.execute_tool(&task_id, diff_invocation("src/index.ts")),
        ApprovalDecision::Denied,
    )
    .await;

    assert!(matches!(
        result.unwrap_err(),
        ServiceError::Engine(EngineError::ApprovalDenied { .. })
    ));
    let names = event_names(&specs, &task_id);
    assert!(names.iter().any(|n| n == "checkpoint_restored"));
    assert!(!names.iter().any(|n| n == "diff_applied"));
}

#[tokio::test]
async fn stop_denies_pending_approvals_and_idles_the_task() {
    let specs = specs();
    let task_id = specs
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();
    specs
        .service
        .enter_stage(&task_id, Stage::Command)
        .await
        .unwrap();

    let run = specs.service.execute_tool(
        &task_id,
        ToolInvocation {
            tool: "npm test".to_string(),
            action: ToolAction::ExecuteCommand,
            files: vec![],
            inputs: json!({}),
            lines: 0,
        },
    );
    tokio::pin!(run);

    // Wait until the approval is pending, then stop the task
    loop {
        tokio::select! {
            biased;
            result = &mut run => {
                // Stop denies the approval, so the tool reports cancelled
                assert!(result.is_err());
                break;
            }
            _ = tokio::task::yield_now() => {
                if !specs.service.approvals().pending_ids().is_empty() {
                    specs.service.stop(&task_id, Some("user stop".into())).await.unwrap();
                }
            }
        }
    }

    assert!(specs.service.approvals().pending_ids().is_empty());
    assert_eq!(specs.service.task_state(&task_id).status, TaskStatus::Idle);
}
