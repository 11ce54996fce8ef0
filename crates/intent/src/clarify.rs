// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clarification question builder.

use crate::analysis::Clarification;
use pilot_core::ClarificationOption;

/// Beyond this many rounds the router stops asking and proceeds with its
/// best guess.
pub const MAX_CLARIFICATION_ATTEMPTS: u32 = 2;

/// A clarification for a prompt whose referent is unknown.
pub(crate) fn missing_reference(prompt: &str) -> Clarification {
    Clarification {
        question: format!(
            "Which file or change does \"{}\" refer to?",
            prompt.trim()
        ),
        options: vec![
            ClarificationOption::new("provide_file", "Point me at a file"),
            ClarificationOption::new("provide_scope", "Describe the scope"),
            ClarificationOption::new("confirm_intent", "Let me restate what I want"),
            ClarificationOption::new("cancel", "Cancel"),
        ],
    }
}

/// A clarification for a prompt whose intent signals tie.
pub(crate) fn ambiguous_intent(prompt: &str) -> Clarification {
    Clarification {
        question: format!(
            "Should I explain, plan, or make the change for \"{}\"?",
            prompt.trim()
        ),
        options: vec![
            ClarificationOption::new("confirm_intent", "Just explain it"),
            ClarificationOption::new("provide_scope", "Make the change"),
            ClarificationOption::new("cancel", "Cancel"),
        ],
    }
}
