// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Large-plan detection.
//!
//! A deterministic 0-100 composite over the plan text plus optional
//! model-provided metadata. Metadata can only raise the score; a confident
//! model never talks the detector out of a warning.

use pilot_core::{Plan, PlanMetadata};
use serde::{Deserialize, Serialize};

const WARN_STEPS: u32 = 8;
const LARGE_STEPS: u32 = 16;

const BIG_SCOPE_KEYWORDS: &[&str] = &[
    "entire", "all ", "every", "whole", "across", "full ", "complete", "system-wide", "end-to-end",
];

const AMBIGUITY_PHRASES: &[&str] = &[
    "maybe",
    "somehow",
    "etc",
    "tbd",
    "not sure",
    "possibly",
    "figure out",
    "to be decided",
];

const RISK_CATEGORIES: &[(&str, &[&str])] = &[
    ("security", &["security", "vulnerability", "cve", "auth"]),
    ("payments", &["payment", "billing", "invoice", "checkout"]),
    ("migration", &["migration", "migrate", "schema change"]),
    ("refactor", &["refactor", "restructure", "rewrite"]),
    ("upgrade", &["upgrade", "version bump", "major version"]),
];

const DOMAINS: &[(&str, &[&str])] = &[
    ("mobile", &["mobile", "ios", "android"]),
    ("web", &["web", "frontend", "browser", "ui"]),
    ("backend", &["backend", "server", "api", "database"]),
];

/// Per-verb estimate of files a step will touch.
const VERB_FILE_ESTIMATES: &[(&str, u32)] = &[
    ("rewrite", 5),
    ("migrate", 5),
    ("redesign", 4),
    ("implement", 4),
    ("integrate", 4),
    ("refactor", 3),
    ("add", 2),
    ("create", 2),
    ("update", 1),
    ("fix", 1),
];

/// Raw metrics the score was computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSizeMetrics {
    pub step_count: u32,
    pub big_scope_hits: u32,
    pub ambiguity_hits: u32,
    pub risk_flags: u32,
    pub domain_count: u32,
    pub estimated_files: u32,
}

/// The detector's decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSizeReport {
    pub large: bool,
    pub score: u32,
    pub reasons: Vec<String>,
    pub metrics: PlanSizeMetrics,
}

impl PlanSizeReport {
    /// Per-component breakdown, built on demand.
    pub fn breakdown(&self) -> Vec<String> {
        let m = &self.metrics;
        vec![
            format!("steps: {}", m.step_count),
            format!("big-scope keywords: {}", m.big_scope_hits),
            format!("ambiguity phrases: {}", m.ambiguity_hits),
            format!("risk categories: {}", m.risk_flags),
            format!("domains spanned: {}", m.domain_count),
            format!("estimated files touched: {}", m.estimated_files),
            format!("score: {}", self.score),
        ]
    }
}

fn plan_text(plan: &Plan) -> String {
    let mut text = plan.title.to_lowercase();
    for step in &plan.steps {
        text.push(' ');
        text.push_str(&step.title.to_lowercase());
        text.push(' ');
        text.push_str(&step.description.to_lowercase());
    }
    text
}

/// Assess a plan, optionally raised by model-provided metadata.
pub fn assess_plan(plan: &Plan, metadata: Option<&PlanMetadata>) -> PlanSizeReport {
    let text = plan_text(plan);
    let step_count = plan.steps.len() as u32;
    let mut reasons = Vec::new();

    // Step count weighs piecewise: linear to the warn threshold, steep after
    let step_score = (if step_count <= WARN_STEPS {
        step_count
    } else {
        WARN_STEPS + (step_count - WARN_STEPS) * 3
    })
    .min(30);
    if step_count > WARN_STEPS {
        reasons.push(format!("{step_count} steps"));
    }

    let big_scope_hits = BIG_SCOPE_KEYWORDS
        .iter()
        .filter(|k| text.contains(*k))
        .count() as u32;
    if big_scope_hits > 0 {
        reasons.push(format!("{big_scope_hits} big-scope keyword(s)"));
    }

    let ambiguity_hits = AMBIGUITY_PHRASES
        .iter()
        .filter(|p| text.contains(*p))
        .count() as u32;
    if ambiguity_hits > 0 {
        reasons.push(format!("{ambiguity_hits} ambiguity phrase(s)"));
    }

    let mut risk_flags = RISK_CATEGORIES
        .iter()
        .filter(|(_, markers)| markers.iter().any(|m| text.contains(m)))
        .count() as u32;

    let domain_count = DOMAINS
        .iter()
        .filter(|(_, markers)| markers.iter().any(|m| text.contains(m)))
        .count() as u32;
    if domain_count > 1 {
        reasons.push(format!("spans {domain_count} domains"));
    }

    let mut estimated_files: u32 = plan
        .steps
        .iter()
        .map(|step| {
            let title = step.title.to_lowercase();
            VERB_FILE_ESTIMATES
                .iter()
                .find(|(verb, _)| title.contains(verb))
                .map(|(_, estimate)| *estimate)
                .unwrap_or(1)
        })
        .sum();

    // Model metadata raises, never lowers
    if let Some(meta) = metadata {
        if let Some(files) = meta.estimated_files_touched {
            estimated_files = estimated_files.max(files);
        }
        risk_flags += meta.risk_areas.len() as u32;
        if !meta.risk_areas.is_empty() {
            reasons.push(format!(
                "model flagged {} extra risk area(s)",
                meta.risk_areas.len()
            ));
        }
    }

    if risk_flags > 0 {
        reasons.push(format!("{risk_flags} risk categor(ies)"));
    }

    let mut score = step_score
        + (big_scope_hits * 5).min(15)
        + (ambiguity_hits * 4).min(12)
        + (risk_flags * 8).min(24)
        + domain_count.saturating_sub(1) * 8
        + estimated_files.min(20);

    if let Some(meta) = metadata {
        if meta.estimated_dev_hours.is_some_and(|h| h >= 16.0) {
            score += 10;
            reasons.push("model estimates multi-day effort".to_string());
        }
        if meta.confidence.is_some_and(|c| c < 0.5) {
            score += 8;
            reasons.push("model confidence is low".to_string());
        }
    }
    let score = score.min(100);

    let large = score >= 60
        || step_count >= LARGE_STEPS
        || (risk_flags >= 2 && step_count >= 10);

    PlanSizeReport {
        large,
        score,
        reasons,
        metrics: PlanSizeMetrics {
            step_count,
            big_scope_hits,
            ambiguity_hits,
            risk_flags,
            domain_count,
            estimated_files,
        },
    }
}

#[cfg(test)]
#[path = "plan_size_tests.rs"]
mod tests;
