// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Weighted intent signal scoring.
//!
//! Counts explain / plan / action keywords plus structural markers and
//! reference context, then applies the dominance rules that decide between
//! answering, planning, and acting.

use crate::context::RouterContext;
use crate::references;
use serde::{Deserialize, Serialize};

const EXPLAIN_KEYWORDS: &[&str] = &[
    "what",
    "why",
    "how",
    "explain",
    "understand",
    "describe",
    "meaning",
    "difference",
    "versus",
    " vs ",
    "compare",
];

const PLAN_KEYWORDS: &[&str] = &[
    "plan",
    "design",
    "architect",
    "roadmap",
    "strategy",
    "approach",
    "steps",
    "break down",
    "organize",
    "restructure",
    "migrate",
];

const ACTION_VERBS: &[&str] = &[
    "fix", "add", "remove", "update", "change", "implement", "create", "write", "delete",
    "rename", "move", "refactor", "install", "upgrade", "convert", "replace", "make", "apply",
];

const DIFF_WORDS: &[&str] = &["diff", "patch", "hunk", "@@"];

/// Raw signal counts for one prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalScores {
    pub explain: i32,
    pub plan: i32,
    pub action: i32,
    pub structural: i32,
    pub file_refs: i32,
    pub context: i32,
}

/// Winner of the dominance rules, or a tie worth clarifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    Explain,
    Plan,
    Action,
    Tie,
}

fn count_hits(lower: &str, keywords: &[&str]) -> i32 {
    keywords.iter().filter(|k| lower.contains(*k)).count() as i32
}

/// Score a prompt against the keyword and structure tables.
pub fn score_signals(prompt: &str, ctx: &RouterContext) -> SignalScores {
    let lower = prompt.to_lowercase();

    let mut structural = 0;
    if lower.contains("```") {
        structural += 2;
    }
    if lower.contains("error:") || lower.contains("stack trace") || lower.contains("    at ") {
        structural += 2;
    }
    // line references like "index.ts:42"
    if lower
        .split_whitespace()
        .any(|w| w.rsplit_once(':').is_some_and(|(_, n)| n.parse::<u64>().is_ok()))
    {
        structural += 1;
    }
    structural += count_hits(&lower, DIFF_WORDS);

    let file_refs = references::explicit_paths(prompt).len() as i32;

    let mut context = 0;
    let deictic = references::has_deictic_reference(&lower);
    if deictic && ctx.last_applied_diff.is_some() {
        context += 2;
    }
    if deictic && ctx.last_open_editor.is_some() {
        context += 1;
    }

    SignalScores {
        explain: count_hits(&lower, EXPLAIN_KEYWORDS),
        plan: count_hits(&lower, PLAN_KEYWORDS),
        action: count_hits(&lower, ACTION_VERBS),
        structural,
        file_refs,
        context,
    }
}

/// Apply the dominance rules.
///
/// Explanation wins when it clearly outweighs action and planning; planning
/// wins when it clearly outweighs both; otherwise action wins unless the
/// top two signals sit within one point of each other, which is a tie.
pub fn dominance(scores: &SignalScores) -> Dominance {
    let SignalScores {
        explain,
        plan,
        action,
        ..
    } = *scores;

    if explain >= action + 2 && explain >= plan + 1 {
        return Dominance::Explain;
    }
    if plan >= action + 1 && plan >= explain + 1 {
        return Dominance::Plan;
    }

    // Parity of the two strongest competing signals within 1 is ambiguous
    let mut ranked = [explain, plan, action];
    ranked.sort_unstable_by(|a, b| b.cmp(a));
    if ranked[0] > 0 && ranked[1] > 0 && (ranked[0] - ranked[1]) <= 1 {
        return Dominance::Tie;
    }

    Dominance::Action
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
