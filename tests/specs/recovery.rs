//! Crash recovery: replay equivalence and the recovery offer.

use crate::prelude::*;
use pilot_core::{Stage, TaskStatus};
use pilot_daemon::StartupDisposition;
use pilot_storage::Projection;
use similar_asserts::assert_eq;

#[tokio::test]
async fn disk_replay_matches_in_memory_projection() {
    let specs = specs();
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
    specs.service.pause(&task_id).await.unwrap();

    let in_memory = specs.service.task_state(&task_id);

    // Pure fold over the raw log file
    let events = specs.service.events_for_task(&task_id).unwrap();
    let refolded = Projection::reduce_for_task(task_id.as_str(), &events);
    assert_eq!(in_memory, refolded);

    // And a fully reopened service agrees
    let reopened = reopen(&specs);
    assert_eq!(reopened.task_state(&task_id), in_memory);
}

#[tokio::test]
async fn crash_produces_recovery_offer_resume_and_discard_work() {
    let specs = specs();
    let task_id = specs
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();
    specs.service.pause(&task_id).await.unwrap();

    // Crash: reopen without mark_clean_exit
    let reopened = reopen(&specs);
    let pointer = match reopened.startup_disposition().unwrap() {
        StartupDisposition::RecoveryOffer(pointer) => pointer,
        other => panic!("expected recovery offer, got {other:?}"),
    };
    assert_eq!(pointer.task_id, task_id);
    assert!(!pointer.cleanly_exited);

    // Resume path
    reopened.recover_task(&task_id).await.unwrap();
    assert_eq!(reopened.task_state(&task_id).status, TaskStatus::Running);

    // Discard path (fresh crash simulation)
    reopened.pause(&task_id).await.unwrap();
    let reopened_again = reopen(&specs);
    reopened_again.discard_task(&task_id).await.unwrap();
    assert_eq!(
        reopened_again.task_state(&task_id).status,
        TaskStatus::Idle
    );
    assert!(matches!(
        reopened_again.startup_disposition().unwrap(),
        StartupDisposition::Fresh
    ));
}

#[tokio::test]
async fn clean_exit_survives_restart_without_offer() {
    let specs = specs();
    let task_id = specs
        .service
        .submit_intent("run the tests", None)
        .unwrap()
        .task_id
        .unwrap();
    specs.service.stop(&task_id, None).await.unwrap();
    specs.service.mark_clean_exit().unwrap();

    let reopened = reopen(&specs);
    assert!(matches!(
        reopened.startup_disposition().unwrap(),
        StartupDisposition::CleanExit(_)
    ));
}

#[tokio::test]
async fn snapshot_cache_does_not_change_observed_state() {
    let specs = specs();
    let task_id = specs
        .service
        .submit_intent("Fix typo in src/index.ts", None)
        .unwrap()
        .task_id
        .unwrap();

    // Snapshot now, then add more events after the snapshot
    specs.service.mark_clean_exit().unwrap();
    specs.service.pause(&task_id).await.unwrap();

    let expected = specs.service.task_state(&task_id);
    let reopened = reopen(&specs);
    assert_eq!(reopened.task_state(&task_id), expected);
}
