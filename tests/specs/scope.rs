//! Scope contract scenarios: blocking, expansion, retry.

use crate::prelude::*;
use pilot_core::{EventKind, ImpactLevel, ScopeContract, ToolAction};
use pilot_daemon::ServiceError;
use pilot_engine::{EngineError, ToolInvocation};
use serde_json::json;
use std::path::PathBuf;

fn read_invocation(file: &str) -> ToolInvocation {
    ToolInvocation {
        tool: "read_file".to_string(),
        action: ToolAction::ReadFile,
        files: vec![PathBuf::from(file)],
        inputs: json!({ "path": file }),
        lines: 10,
    }
}

#[tokio::test]
async fn out_of_contract_read_blocks_then_expansion_unblocks() {
    let specs = specs();
    let task_id = specs
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();

    // Contract: one file, a.ts only
    let plan = pilot_core::test_support::plan_with_contract(
        "plan-1",
        &["a.ts"],
        ScopeContract::default(),
    );
    specs.service.submit_plan(&task_id, plan, None).await.unwrap();

    // b.ts is out of contract: blocked with a low-impact expansion proposal
    let err = specs
        .service
        .execute_tool(&task_id, read_invocation("b.ts"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Engine(EngineError::ScopeBlocked { .. })
    ));

    let events = specs.service.events_for_task(&task_id).unwrap();
    let request_id = events
        .iter()
        .find_map(|e| match e.kind() {
            Some(EventKind::ScopeExpansionRequested {
                request_id,
                expansion,
            }) => {
                assert_eq!(expansion.impact_level, ImpactLevel::Low);
                assert_eq!(expansion.files, vec![PathBuf::from("b.ts")]);
                Some(request_id.clone())
            }
            _ => None,
        })
        .unwrap();

    specs
        .service
        .resolve_scope_expansion(&request_id, true)
        .await
        .unwrap();

    // max_files grew by the one new file and b.ts is in scope
    let state = specs.service.task_state(&task_id);
    let contract = state.scope_summary.contract.as_ref().unwrap();
    assert_eq!(contract.max_files, 2);
    assert!(state
        .scope_summary
        .in_scope_files
        .contains(&PathBuf::from("b.ts")));

    // The identical request now succeeds
    specs
        .service
        .execute_tool(&task_id, read_invocation("b.ts"))
        .await
        .unwrap();
}

#[tokio::test]
async fn denied_expansion_keeps_the_contract() {
    let specs = specs();
    let task_id = specs
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();

    let plan = pilot_core::test_support::plan_with_contract(
        "plan-1",
        &["a.ts"],
        ScopeContract::default(),
    );
    specs.service.submit_plan(&task_id, plan, None).await.unwrap();

    specs
        .service
        .execute_tool(&task_id, read_invocation("b.ts"))
        .await
        .unwrap_err();

    let events = specs.service.events_for_task(&task_id).unwrap();
    let request_id = events
        .iter()
        .find_map(|e| match e.kind() {
            Some(EventKind::ScopeExpansionRequested { request_id, .. }) => {
                Some(request_id.clone())
            }
            _ => None,
        })
        .unwrap();

    specs
        .service
        .resolve_scope_expansion(&request_id, false)
        .await
        .unwrap();

    let state = specs.service.task_state(&task_id);
    assert_eq!(state.scope_summary.contract.as_ref().unwrap().max_files, 1);

    // Still blocked
    let err = specs
        .service
        .execute_tool(&task_id, read_invocation("b.ts"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Engine(EngineError::ScopeBlocked { .. })
    ));
}

#[tokio::test]
async fn line_budget_accrues_across_reads() {
    let specs = specs();
    let task_id = specs
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();

    let mut contract = ScopeContract::default();
    contract.max_lines = 15;
    let plan = pilot_core::test_support::plan_with_contract("plan-1", &["a.ts"], contract);
    specs.service.submit_plan(&task_id, plan, None).await.unwrap();

    // First read of 10 lines fits
    specs
        .service
        .execute_tool(&task_id, read_invocation("a.ts"))
        .await
        .unwrap();
    assert_eq!(specs.service.task_state(&task_id).scope_summary.lines_retrieved, 10);

    // Second read of 10 lines would exceed the 15-line budget
    let err = specs
        .service
        .execute_tool(&task_id, read_invocation("a.ts"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Engine(EngineError::ScopeBlocked { .. })
    ));
}
