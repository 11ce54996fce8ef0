// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Early detection of "just run something" prompts.
//!
//! Runs before signal scoring so obvious command requests never get routed
//! into planning, and diagnostic questions never get routed into execution.

use serde::{Deserialize, Serialize};

/// Direct package-runner / build-tool tokens.
const RUNNER_TOKENS: &[&str] = &[
    "npm", "pnpm", "yarn", "npx", "bun", "cargo", "pip", "poetry", "make", "gradle", "mvn", "go",
];

/// Command verbs that pair with a target.
const COMMAND_VERBS: &[&str] = &["run", "start", "restart", "launch", "execute", "build", "rerun"];

/// Targets with the commands they imply.
const COMMAND_TARGETS: &[(&str, &str)] = &[
    ("tests", "npm test"),
    ("test suite", "npm test"),
    ("unit tests", "npm test"),
    ("dev server", "npm run dev"),
    ("dev", "npm run dev"),
    ("server", "npm start"),
    ("build", "npm run build"),
    ("linter", "npm run lint"),
    ("lint", "npm run lint"),
];

const QUESTION_OPENERS: &[&str] = &[
    "why ", "what ", "how ", "when ", "where ", "who ", "which ", "is ", "are ", "does ", "do ",
    "can ", "could ", "should ", "would ",
];

const EXPLANATION_MARKERS: &[&str] = &[
    "explain",
    "describe",
    "walk me through",
    "help me understand",
    "tell me about",
    "what's wrong",
    "what is wrong",
];

const GREENFIELD_MARKERS: &[&str] = &[
    "from scratch",
    "greenfield",
    "new project",
    "new app",
    "new application",
    "start a new",
    "scaffold",
    "bootstrap a",
];

/// Outcome of command-intent detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandIntent {
    pub is_command_intent: bool,
    pub confidence: f64,
    /// Concrete commands to run, when inferable
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    pub reason: String,
}

impl CommandIntent {
    fn no(confidence: f64, reason: &str) -> Self {
        Self {
            is_command_intent: false,
            confidence,
            commands: Vec::new(),
            reason: reason.to_string(),
        }
    }

    fn yes(confidence: f64, commands: Vec<String>, reason: &str) -> Self {
        Self {
            is_command_intent: true,
            confidence,
            commands,
            reason: reason.to_string(),
        }
    }
}

/// Whether a prompt reads as a greenfield request.
pub(crate) fn is_greenfield(prompt_lower: &str) -> bool {
    if GREENFIELD_MARKERS.iter().any(|m| prompt_lower.contains(m)) {
        return true;
    }
    // "create/build a new <thing> application|app|project|site"
    (prompt_lower.contains("create a new") || prompt_lower.contains("build a new"))
        && ["application", "app", "project", "site", "service"]
            .iter()
            .any(|t| prompt_lower.contains(t))
}

pub(crate) fn is_question_like(prompt_lower: &str) -> bool {
    QUESTION_OPENERS.iter().any(|o| prompt_lower.starts_with(o))
        || prompt_lower.trim_end().ends_with('?')
}

pub(crate) fn is_explanation(prompt_lower: &str) -> bool {
    EXPLANATION_MARKERS.iter().any(|m| prompt_lower.contains(m))
}

/// Classify whether a prompt is a direct request to run a command.
pub fn detect_command_intent(prompt: &str) -> CommandIntent {
    let lower = prompt.trim().to_lowercase();

    // Diagnostic / explanation prompts short-circuit to non-command even
    // when they mention runnable things ("why does npm test fail?").
    if is_question_like(&lower) || is_explanation(&lower) {
        return CommandIntent::no(0.9, "diagnostic or explanation prompt");
    }

    // Greenfield work is never a bare command
    if is_greenfield(&lower) {
        return CommandIntent::no(0.9, "greenfield request");
    }

    // Direct runner invocation: "npm test", "pnpm run build", "cargo check"
    let mut words = lower.split_whitespace();
    if let Some(first) = words.next() {
        if RUNNER_TOKENS.contains(&first) && words.next().is_some() {
            return CommandIntent::yes(
                0.95,
                vec![lower.clone()],
                "direct package-runner invocation",
            );
        }
    }

    let has_verb = COMMAND_VERBS
        .iter()
        .any(|v| lower.split_whitespace().any(|w| w == *v));
    let target = COMMAND_TARGETS
        .iter()
        .find(|(t, _)| lower.contains(t));

    match (has_verb, target) {
        (true, Some((_, command))) => CommandIntent::yes(
            0.8,
            vec![(*command).to_string()],
            "command verb with known target",
        ),
        // Verb or target alone is a weak signal, not a command
        (true, None) => CommandIntent::no(0.4, "command verb without target"),
        (false, Some(_)) => CommandIntent::no(0.4, "target without command verb"),
        (false, None) => CommandIntent::no(0.2, "no command signal"),
    }
}

#[cfg(test)]
#[path = "command_intent_tests.rs"]
mod tests;
