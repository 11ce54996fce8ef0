// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    typo     = { "Fix typo in src/index.ts" },
    rename   = { "rename the helper function" },
    spelling = { "correct spelling in the docs" },
)]
fn trivial_patterns_short_circuit(prompt: &str) {
    let assessment = assess_scope(prompt);
    assert_eq!(assessment.scope, DetectedScope::Trivial);
}

#[test]
fn greenfield_forces_large() {
    let assessment = assess_scope("Create a new React application from scratch");
    assert_eq!(assessment.scope, DetectedScope::Large);
    assert_eq!(assessment.reasons, vec!["greenfield request".to_string()]);
}

#[test]
fn single_small_edit_is_trivial_or_small() {
    let assessment = assess_scope("fix the null check in src/auth.ts");
    assert!(assessment.scope <= DetectedScope::Small);
}

#[test]
fn system_keywords_push_score_up() {
    let small = assess_scope("update the header color");
    let systemic = assess_scope("update the authentication and payments database flow");
    assert!(systemic.score > small.score);
    assert!(systemic.scope >= DetectedScope::Medium);
}

#[test]
fn large_verbs_and_connectives_reach_large() {
    let assessment = assess_scope(
        "migrate the billing database to the new api, then rewrite the auth integration and also redesign the cache layer",
    );
    assert_eq!(assessment.scope, DetectedScope::Large);
    assert!(assessment.score > 50);
}

#[test]
fn reasons_name_contributing_signals() {
    let assessment = assess_scope("rewrite src/a.ts and src/b.ts, then update the api");
    let joined = assessment.reasons.join("; ");
    assert!(joined.contains("large-change verb"));
    assert!(joined.contains("referenced file"));
    assert!(joined.contains("multi-step connective"));
}

#[yare::parameterized(
    zero      = { 0, DetectedScope::Trivial },
    ten       = { 10, DetectedScope::Trivial },
    eleven    = { 11, DetectedScope::Small },
    twentyfive = { 25, DetectedScope::Small },
    twentysix = { 26, DetectedScope::Medium },
    fifty     = { 50, DetectedScope::Medium },
    fiftyone  = { 51, DetectedScope::Large },
)]
fn bucket_thresholds(score: u32, expected: DetectedScope) {
    assert_eq!(super::bucket(score), expected);
}
