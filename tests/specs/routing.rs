//! Intent routing scenarios: question, greenfield, ambiguity, override.

use crate::prelude::*;
use pilot_core::{Behavior, Mode};
use pilot_intent::DetectedScope;

#[tokio::test]
async fn pure_question_answers_without_tools() {
    let specs = specs();
    let outcome = specs
        .service
        .submit_intent("What is dependency injection?", None)
        .unwrap();

    assert_eq!(outcome.analysis.behavior, Behavior::Answer);
    assert_eq!(outcome.analysis.derived_mode, Mode::Answer);
    assert!(outcome.analysis.confidence >= 0.8);

    let task_id = outcome.task_id.unwrap();
    let names = event_names(&specs, &task_id);
    assert!(!names.iter().any(|n| n == "tool_start"));
}

#[tokio::test]
async fn greenfield_prompt_plans_large() {
    let specs = specs();
    let outcome = specs
        .service
        .submit_intent("Create a new React application from scratch", None)
        .unwrap();

    assert_eq!(outcome.analysis.behavior, Behavior::Plan);
    assert_eq!(outcome.analysis.detected_scope, Some(DetectedScope::Large));

    // Command-intent detection never mistakes greenfield for a command
    let command = pilot_intent::detect_command_intent("Create a new React application from scratch");
    assert!(!command.is_command_intent);
}

#[tokio::test]
async fn trivial_fix_routes_to_quick_action_with_reference() {
    let specs = specs();
    let outcome = specs
        .service
        .submit_intent("Fix typo in src/index.ts", None)
        .unwrap();

    assert_eq!(outcome.analysis.behavior, Behavior::QuickAction);
    assert_eq!(outcome.analysis.detected_scope, Some(DetectedScope::Trivial));
    assert_eq!(
        outcome.analysis.referenced_files,
        vec![std::path::PathBuf::from("src/index.ts")]
    );
}

#[tokio::test]
async fn ambiguous_reference_clarifies_with_provide_file_and_cancel() {
    let specs = specs();
    let outcome = specs.service.submit_intent("Fix this", None).unwrap();

    assert_eq!(outcome.analysis.behavior, Behavior::Clarify);
    let clarification = outcome.analysis.clarification.unwrap();
    assert!(clarification.options.len() <= 4);
    assert!(clarification.options.iter().any(|o| o.action == "provide_file"));
    assert!(clarification.options.iter().any(|o| o.action == "cancel"));
}

#[tokio::test]
async fn clarification_loop_caps_at_two_attempts() {
    let specs = specs();
    let task_id = specs
        .service
        .submit_intent("Fix this", None)
        .unwrap()
        .task_id
        .unwrap();

    // First vague answer re-asks
    let second = specs
        .service
        .respond_clarification(&task_id, "you know, the thing")
        .unwrap();
    assert_eq!(second.analysis.behavior, Behavior::Clarify);

    // Past the cap the router proceeds with its best guess
    let third = specs
        .service
        .respond_clarification(&task_id, "just do it")
        .unwrap();
    assert_ne!(third.analysis.behavior, Behavior::Clarify);
}

#[tokio::test]
async fn slash_override_wins_over_content() {
    let specs = specs();
    let outcome = specs
        .service
        .submit_intent("/plan what is dependency injection?", None)
        .unwrap();
    assert_eq!(outcome.analysis.behavior, Behavior::Plan);
    assert_eq!(outcome.analysis.confidence, 1.0);
}
