// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Behaviors: the router's primary decision for a prompt.

use crate::mode::Mode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the system does with a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    #[serde(rename = "ANSWER")]
    Answer,
    #[serde(rename = "CLARIFY")]
    Clarify,
    #[serde(rename = "QUICK_ACTION")]
    QuickAction,
    #[serde(rename = "PLAN")]
    Plan,
    #[serde(rename = "CONTINUE_RUN")]
    ContinueRun,
}

impl Behavior {
    /// The permission mode a behavior runs under.
    pub fn derived_mode(self) -> Mode {
        match self {
            Behavior::Answer | Behavior::Clarify => Mode::Answer,
            Behavior::QuickAction | Behavior::ContinueRun => Mode::Mission,
            Behavior::Plan => Mode::Plan,
        }
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Behavior::Answer => "ANSWER",
            Behavior::Clarify => "CLARIFY",
            Behavior::QuickAction => "QUICK_ACTION",
            Behavior::Plan => "PLAN",
            Behavior::ContinueRun => "CONTINUE_RUN",
        };
        write!(f, "{s}")
    }
}
