// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The intent router: prompt + context → behavior + derived mode.
//!
//! Decision order matters and is fixed: explicit slash overrides, then
//! command-intent early detection, then the active-run check, then pure
//! questions, then reference resolution, then signal dominance, and scope
//! detection last. Earlier stages are cheaper and higher-precision; once a
//! stage decides, later stages never override it.

use crate::analysis::{ContextSource, IntentAnalysis};
use crate::clarify::{self, MAX_CLARIFICATION_ATTEMPTS};
use crate::command_intent::{detect_command_intent, is_question_like};
use crate::context::{has_active_run, RouterContext};
use crate::references::{self, resolve_references, ReferenceResolution};
use crate::scope_detect::{assess_scope, DetectedScope};
use crate::signals::{dominance, score_signals, Dominance};
use pilot_core::Behavior;

/// Deterministic prompt classifier.
pub struct IntentRouter;

impl IntentRouter {
    /// Classify one prompt against the current run context.
    pub fn analyze(prompt: &str, ctx: &RouterContext) -> IntentAnalysis {
        let trimmed = prompt.trim();

        // 1. Slash overrides are absolute
        if let Some((behavior, rest)) = slash_override(trimmed) {
            let mut analysis = IntentAnalysis::new(
                behavior,
                ContextSource::SlashOverride,
                1.0,
                "explicit slash override",
            );
            analysis.user_override = Some(behavior);
            analysis.referenced_files = references::explicit_paths(rest);
            if behavior == Behavior::QuickAction {
                analysis.detected_scope = Some(assess_scope(rest).scope);
            }
            return analysis;
        }

        // 2. Obvious command requests skip classification entirely
        let command = detect_command_intent(trimmed);
        if command.is_command_intent && command.confidence >= 0.75 {
            let mut analysis = IntentAnalysis::new(
                Behavior::QuickAction,
                ContextSource::CommandIntent,
                command.confidence,
                command.reason.clone(),
            );
            analysis.inferred_commands = command.commands;
            analysis.detected_scope = Some(DetectedScope::Small);
            return analysis;
        }

        // 3. An unresolved blocking interaction routes back into the run
        if has_active_run(&ctx.recent_events) {
            return IntentAnalysis::new(
                Behavior::ContinueRun,
                ContextSource::ActiveRun,
                0.9,
                "unresolved blocking interaction in the current run",
            );
        }

        // 4. Pure questions answer without tooling
        let lower = trimmed.to_lowercase();
        let scores = score_signals(trimmed, ctx);
        if is_question_like(&lower) && scores.action == 0 {
            return IntentAnalysis::new(
                Behavior::Answer,
                ContextSource::PureQuestion,
                0.85,
                "question with no action verbs",
            );
        }

        // 5. Resolve what the prompt points at
        let resolution = resolve_references(trimmed, ctx);
        let referenced_files = match &resolution {
            ReferenceResolution::Files(files) => files.clone(),
            _ => Vec::new(),
        };
        let reference_exhausted = resolution == ReferenceResolution::Ambiguous
            && ctx.clarification_attempts >= MAX_CLARIFICATION_ATTEMPTS;
        if resolution == ReferenceResolution::Ambiguous && !reference_exhausted {
            let mut analysis = IntentAnalysis::new(
                Behavior::Clarify,
                ContextSource::ReferenceResolution,
                0.5,
                "prompt refers to something but nothing in context says what",
            );
            analysis.clarification = Some(clarify::missing_reference(trimmed));
            return analysis;
        }

        // 6. Signal dominance
        let mut tie_exhausted = false;
        match dominance(&scores) {
            Dominance::Explain => {
                let mut analysis = IntentAnalysis::new(
                    Behavior::Answer,
                    ContextSource::SignalScoring,
                    0.8,
                    "explanation signals dominate",
                );
                analysis.referenced_files = referenced_files;
                return analysis;
            }
            Dominance::Plan => {
                let assessment = assess_scope(trimmed);
                let mut analysis = IntentAnalysis::new(
                    Behavior::Plan,
                    ContextSource::SignalScoring,
                    0.8,
                    "planning signals dominate",
                );
                analysis.detected_scope = Some(assessment.scope);
                analysis.referenced_files = referenced_files;
                return analysis;
            }
            Dominance::Tie => {
                if ctx.clarification_attempts < MAX_CLARIFICATION_ATTEMPTS {
                    let mut analysis = IntentAnalysis::new(
                        Behavior::Clarify,
                        ContextSource::SignalScoring,
                        0.5,
                        "intent signals tie within one point",
                    );
                    analysis.clarification = Some(clarify::ambiguous_intent(trimmed));
                    analysis.referenced_files = referenced_files;
                    return analysis;
                }
                tie_exhausted = true;
            }
            Dominance::Action => {}
        }

        // 7 + 8. Scope decides between acting now and planning first
        let assessment = assess_scope(trimmed);
        let behavior = match assessment.scope {
            DetectedScope::Trivial | DetectedScope::Small => Behavior::QuickAction,
            DetectedScope::Medium | DetectedScope::Large => Behavior::Plan,
        };

        let best_guess = tie_exhausted || reference_exhausted;
        let mut reasoning = if assessment.reasons.is_empty() {
            "action prompt".to_string()
        } else {
            assessment.reasons.join("; ")
        };
        if best_guess {
            reasoning = format!("clarification attempts exhausted; best guess: {reasoning}");
        }

        let mut analysis = IntentAnalysis::new(
            behavior,
            if best_guess {
                ContextSource::BestGuess
            } else {
                ContextSource::ScopeDetection
            },
            if best_guess { 0.55 } else { 0.7 },
            reasoning,
        );
        analysis.detected_scope = Some(assessment.scope);
        analysis.referenced_files = referenced_files;
        analysis
    }
}

/// `/chat /ask /do /edit /run /plan /mission` force a behavior.
fn slash_override(prompt: &str) -> Option<(Behavior, &str)> {
    let (command, rest) = match prompt.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r),
        None => (prompt, ""),
    };
    let behavior = match command {
        "/chat" | "/ask" => Behavior::Answer,
        "/plan" => Behavior::Plan,
        "/do" | "/edit" | "/run" | "/mission" => Behavior::QuickAction,
        _ => return None,
    };
    Some((behavior, rest))
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
