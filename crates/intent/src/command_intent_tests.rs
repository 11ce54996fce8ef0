// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    npm_test    = { "npm test" },
    pnpm_build  = { "pnpm run build" },
    cargo_check = { "cargo check" },
    yarn_dev    = { "yarn dev" },
)]
fn direct_runner_invocations_are_commands(prompt: &str) {
    let intent = detect_command_intent(prompt);
    assert!(intent.is_command_intent);
    assert!(intent.confidence >= 0.9);
    assert_eq!(intent.commands, vec![prompt.to_string()]);
}

#[yare::parameterized(
    run_tests  = { "run the tests", "npm test" },
    start_dev  = { "start the dev server", "npm run dev" },
    build_it   = { "build the build", "npm run build" },
    lint       = { "run lint please", "npm run lint" },
)]
fn verb_plus_target_infers_command(prompt: &str, expected: &str) {
    let intent = detect_command_intent(prompt);
    assert!(intent.is_command_intent);
    assert_eq!(intent.commands, vec![expected.to_string()]);
}

#[test]
fn verb_alone_is_weak() {
    let intent = detect_command_intent("run it again please somehow");
    assert!(!intent.is_command_intent);
    assert!(intent.confidence < 0.5);
}

#[test]
fn target_alone_is_weak() {
    let intent = detect_command_intent("the tests are over there");
    assert!(!intent.is_command_intent);
}

#[yare::parameterized(
    why_fail    = { "why does npm test fail?" },
    whats_wrong = { "what's wrong with the build" },
    explain     = { "explain how the dev server starts" },
)]
fn diagnostics_short_circuit_to_non_command(prompt: &str) {
    let intent = detect_command_intent(prompt);
    assert!(!intent.is_command_intent);
    assert!(intent.confidence >= 0.9);
}

#[yare::parameterized(
    scratch = { "Create a new React application from scratch" },
    new_app = { "build a new app for invoices" },
)]
fn greenfield_blocks_command_routing(prompt: &str) {
    let intent = detect_command_intent(prompt);
    assert!(!intent.is_command_intent);
}

#[test]
fn plain_edits_are_not_commands() {
    let intent = detect_command_intent("fix the typo in src/index.ts");
    assert!(!intent.is_command_intent);
}
