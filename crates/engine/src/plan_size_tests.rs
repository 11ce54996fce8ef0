// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pilot_core::{PlanId, PlanStep};

fn plan_with_steps(titles: &[&str]) -> Plan {
    Plan {
        plan_id: PlanId::new("plan-1"),
        title: "work".to_string(),
        steps: titles.iter().map(|t| PlanStep::new(*t)).collect(),
        scope_contract: None,
        in_scope_files: Vec::new(),
    }
}

#[test]
fn small_plan_is_not_large() {
    let plan = plan_with_steps(&["fix the header", "update the test"]);
    let report = assess_plan(&plan, None);
    assert!(!report.large);
    assert!(report.score < 60);
}

#[test]
fn sixteen_steps_force_large_regardless_of_score() {
    let titles: Vec<String> = (0..16).map(|i| format!("fix item {i}")).collect();
    let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
    let report = assess_plan(&plan_with_steps(&refs), None);
    assert!(report.large);
    assert_eq!(report.metrics.step_count, 16);
}

#[test]
fn two_risk_flags_and_ten_steps_force_large() {
    let mut titles: Vec<String> = (0..8).map(|i| format!("update item {i}")).collect();
    titles.push("harden security checks".to_string());
    titles.push("rework payment retries".to_string());
    let refs: Vec<&str> = titles.iter().map(String::as_str).collect();

    let report = assess_plan(&plan_with_steps(&refs), None);
    assert!(report.metrics.risk_flags >= 2);
    assert_eq!(report.metrics.step_count, 10);
    assert!(report.large);
}

#[test]
fn score_sixty_marks_large() {
    let plan = plan_with_steps(&[
        "rewrite the entire backend api",
        "migrate every database schema across services",
        "redesign the whole frontend ui",
        "integrate the mobile app end-to-end",
    ]);
    let report = assess_plan(&plan, None);
    assert!(report.score >= 60, "score was {}", report.score);
    assert!(report.large);
}

#[test]
fn metadata_can_raise_but_not_lower() {
    let plan = plan_with_steps(&["update the readme"]);
    let base = assess_plan(&plan, None);
    assert!(!base.large);

    let optimistic = PlanMetadata {
        estimated_files_touched: Some(0),
        confidence: Some(1.0),
        ..Default::default()
    };
    let raised = PlanMetadata {
        estimated_files_touched: Some(40),
        estimated_dev_hours: Some(40.0),
        risk_areas: vec!["security".to_string(), "payments".to_string()],
        confidence: Some(0.2),
        ..Default::default()
    };

    assert!(assess_plan(&plan, Some(&optimistic)).score >= base.score);
    assert!(assess_plan(&plan, Some(&raised)).score > base.score);
}

#[test]
fn low_model_confidence_raises_score() {
    let plan = plan_with_steps(&["update the readme"]);
    let base = assess_plan(&plan, None).score;
    let unsure = PlanMetadata {
        confidence: Some(0.3),
        ..Default::default()
    };
    assert_eq!(assess_plan(&plan, Some(&unsure)).score, base + 8);
}

#[test]
fn reasons_are_human_readable() {
    let plan = plan_with_steps(&["migrate the entire billing database", "maybe fix the api"]);
    let report = assess_plan(&plan, None);
    assert!(!report.reasons.is_empty());
    let joined = report.reasons.join("; ");
    assert!(joined.contains("big-scope") || joined.contains("risk") || joined.contains("ambiguity"));
}

#[test]
fn breakdown_is_on_demand_and_complete() {
    let plan = plan_with_steps(&["fix one thing"]);
    let report = assess_plan(&plan, None);
    let breakdown = report.breakdown();
    assert_eq!(breakdown.len(), 7);
    assert!(breakdown[0].starts_with("steps:"));
}

#[test]
fn score_is_clamped_to_100() {
    let titles: Vec<String> = (0..40)
        .map(|i| format!("rewrite the entire security payment migration system {i}"))
        .collect();
    let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
    let report = assess_plan(&plan_with_steps(&refs), None);
    assert!(report.score <= 100);
}
