// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The router's output shape.

use crate::scope_detect::DetectedScope;
use pilot_core::{Behavior, ClarificationOption, Mode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which part of the pipeline decided the behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    SlashOverride,
    CommandIntent,
    ActiveRun,
    PureQuestion,
    ReferenceResolution,
    SignalScoring,
    ScopeDetection,
    BestGuess,
}

/// A clarification question with at most four user actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clarification {
    pub question: String,
    pub options: Vec<ClarificationOption>,
}

/// The full routing decision for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentAnalysis {
    pub behavior: Behavior,
    pub context_source: ContextSource,
    pub confidence: f64,
    pub reasoning: String,
    pub derived_mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_scope: Option<DetectedScope>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_override: Option<Behavior>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<Clarification>,
    /// Commands inferred by command-intent detection (e.g. `npm test`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inferred_commands: Vec<String>,
}

impl IntentAnalysis {
    pub(crate) fn new(
        behavior: Behavior,
        context_source: ContextSource,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            behavior,
            context_source,
            confidence,
            reasoning: reasoning.into(),
            derived_mode: behavior.derived_mode(),
            detected_scope: None,
            referenced_files: Vec::new(),
            user_override: None,
            clarification: None,
            inferred_commands: Vec::new(),
        }
    }
}
