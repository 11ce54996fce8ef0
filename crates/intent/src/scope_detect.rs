// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scope detection: how big is the requested change.

use crate::command_intent::is_greenfield;
use crate::references;
use serde::{Deserialize, Serialize};

const TRIVIAL_PATTERNS: &[&str] = &[
    "fix typo",
    "fix the typo",
    "fix a typo",
    "correct spelling",
    "rename",
    "bump version",
    "update comment",
    "add a comment",
    "fix spacing",
    "fix formatting",
];

const LARGE_VERBS: &[&str] = &[
    "rewrite",
    "redesign",
    "migrate",
    "overhaul",
    "re-architect",
    "rearchitect",
    "rebuild",
    "integrate",
    "implement",
    "modernize",
];

const SMALL_VERBS: &[&str] = &[
    "fix", "tweak", "adjust", "update", "add", "remove", "correct", "clean",
];

const MULTI_STEP_CONNECTIVES: &[&str] =
    &[" and then ", " then ", ", then", "after that", "as well as", " and also ", "; "];

const SYSTEM_KEYWORDS: &[&str] = &[
    "auth",
    "authentication",
    "authorization",
    "payment",
    "payments",
    "billing",
    "database",
    "migration",
    "api",
    "security",
    "deploy",
    "infrastructure",
    "cache",
    "websocket",
    "queue",
];

const LARGE_VERB_WEIGHT: u32 = 12;
const SMALL_VERB_WEIGHT: u32 = 4;
const FILE_WEIGHT: u32 = 5;
const CONNECTIVE_WEIGHT: u32 = 6;
const SYSTEM_WEIGHT: u32 = 10;

/// Size bucket for a requested change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedScope {
    Trivial,
    Small,
    Medium,
    Large,
}

/// Scope decision with its score and contributing reasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeAssessment {
    pub scope: DetectedScope,
    pub score: u32,
    pub reasons: Vec<String>,
}

fn bucket(score: u32) -> DetectedScope {
    match score {
        0..=10 => DetectedScope::Trivial,
        11..=25 => DetectedScope::Small,
        26..=50 => DetectedScope::Medium,
        _ => DetectedScope::Large,
    }
}

/// Assess how large the requested change is.
pub fn assess_scope(prompt: &str) -> ScopeAssessment {
    let lower = prompt.to_lowercase();
    let mut reasons = Vec::new();

    if is_greenfield(&lower) {
        return ScopeAssessment {
            scope: DetectedScope::Large,
            score: 100,
            reasons: vec!["greenfield request".to_string()],
        };
    }

    if TRIVIAL_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ScopeAssessment {
            scope: DetectedScope::Trivial,
            score: 0,
            reasons: vec!["trivial edit pattern".to_string()],
        };
    }

    let mut score = 0u32;

    let large_hits = LARGE_VERBS.iter().filter(|v| lower.contains(*v)).count() as u32;
    if large_hits > 0 {
        score += large_hits * LARGE_VERB_WEIGHT;
        reasons.push(format!("{large_hits} large-change verb(s)"));
    }

    let small_hits = SMALL_VERBS
        .iter()
        .filter(|v| lower.split_whitespace().any(|w| w.starts_with(*v)))
        .count() as u32;
    if small_hits > 0 {
        score += small_hits * SMALL_VERB_WEIGHT;
        reasons.push(format!("{small_hits} small-change verb(s)"));
    }

    let files = references::explicit_paths(prompt).len() as u32;
    if files > 0 {
        score += files * FILE_WEIGHT;
        reasons.push(format!("{files} referenced file(s)"));
    }

    let connectives = MULTI_STEP_CONNECTIVES
        .iter()
        .filter(|c| lower.contains(*c))
        .count() as u32;
    if connectives > 0 {
        score += connectives * CONNECTIVE_WEIGHT;
        reasons.push(format!("{connectives} multi-step connective(s)"));
    }

    let systems = SYSTEM_KEYWORDS.iter().filter(|k| lower.contains(*k)).count() as u32;
    if systems > 0 {
        score += systems * SYSTEM_WEIGHT;
        reasons.push(format!("{systems} system dependency keyword(s)"));
    }

    ScopeAssessment {
        scope: bucket(score),
        score,
        reasons,
    }
}

#[cfg(test)]
#[path = "scope_detect_tests.rs"]
mod tests;
