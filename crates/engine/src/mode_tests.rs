// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::publish::MemoryPublisher;

fn manager(initial: Mode) -> (Arc<MemoryPublisher>, ModeManager) {
    let publisher = Arc::new(MemoryPublisher::new());
    let manager = ModeManager::new(TaskId::new("task-1"), initial, publisher.clone());
    (publisher, manager)
}

#[test]
fn set_mode_emits_mode_changed() {
    let (publisher, mut manager) = manager(Mode::Answer);
    let change = manager.set_mode(Mode::Mission).unwrap();

    assert!(change.changed);
    assert_eq!(change.from_mode, Mode::Answer);
    assert_eq!(change.to_mode, Mode::Mission);
    assert_eq!(publisher.type_names(), vec!["mode_changed"]);
}

#[test]
fn same_mode_is_a_no_op() {
    let (publisher, mut manager) = manager(Mode::Plan);
    let change = manager.set_mode(Mode::Plan).unwrap();

    assert!(!change.changed);
    assert!(publisher.events().is_empty());
}

#[test]
fn leaving_mission_resets_stage() {
    let (_publisher, mut manager) = manager(Mode::Mission);
    manager.set_stage(Stage::Edit).unwrap();
    assert_eq!(manager.stage(), Stage::Edit);

    manager.set_mode(Mode::Plan).unwrap();
    assert_eq!(manager.mode(), Mode::Plan);
    assert_eq!(manager.stage(), Stage::None);
}

#[test]
fn set_stage_outside_mission_fails() {
    let (publisher, mut manager) = manager(Mode::Answer);
    let err = manager.set_stage(Stage::Edit).unwrap_err();
    assert!(matches!(err, EngineError::StageOutsideMission { .. }));
    assert!(publisher.events().is_empty());
}

#[test]
fn set_stage_emits_stage_changed_in_mission() {
    let (publisher, mut manager) = manager(Mode::Mission);
    manager.set_stage(Stage::Retrieve).unwrap();

    let events = publisher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].type_name(), "stage_changed");
    assert_eq!(events[0].mode, Mode::Mission);
    assert_eq!(events[0].stage, Stage::Retrieve);
}

#[test]
fn enforce_allowed_action_emits_nothing() {
    let (publisher, manager) = manager(Mode::Answer);
    assert!(manager.enforce_action(ToolAction::ReadFile).unwrap());
    assert!(publisher.events().is_empty());
}

#[test]
fn enforce_rejection_emits_exactly_one_mode_violation() {
    let (publisher, manager) = manager(Mode::Answer);
    let allowed = manager.enforce_action(ToolAction::WriteFile).unwrap();

    assert!(!allowed);
    assert_eq!(publisher.count_of("mode_violation"), 1);
    assert_eq!(publisher.events().len(), 1);
}

#[test]
fn validate_does_not_emit() {
    let (publisher, manager) = manager(Mode::Answer);
    let check = manager.validate_action(ToolAction::ExecuteCommand);
    assert!(!check.allowed);
    assert!(check.violation.is_some());
    assert!(publisher.events().is_empty());
}

#[yare::parameterized(
    edit_allows_write   = { Stage::Edit, ToolAction::WriteFile, true },
    test_allows_exec    = { Stage::Test, ToolAction::ExecuteCommand, true },
    edit_rejects_exec   = { Stage::Edit, ToolAction::ExecuteCommand, false },
    test_rejects_write  = { Stage::Test, ToolAction::WriteFile, false },
)]
fn stage_matrix(stage: Stage, action: ToolAction, allowed: bool) {
    let (_publisher, mut manager) = manager(Mode::Mission);
    manager.set_stage(stage).unwrap();
    assert_eq!(manager.validate_action(action).allowed, allowed);
}
