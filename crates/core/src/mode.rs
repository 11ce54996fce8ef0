// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permission modes, MISSION stages, and the mode/stage action matrix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission envelope a task runs under.
///
/// ANSWER answers questions without side effects, PLAN may additionally
/// produce plans, MISSION executes staged work with full tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "ANSWER")]
    Answer,
    #[serde(rename = "PLAN")]
    Plan,
    #[serde(rename = "MISSION")]
    Mission,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Answer
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Answer => write!(f, "ANSWER"),
            Mode::Plan => write!(f, "PLAN"),
            Mode::Mission => write!(f, "MISSION"),
        }
    }
}

/// MISSION-internal sub-state. `None` everywhere outside MISSION.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Plan,
    Retrieve,
    Edit,
    Test,
    Repair,
    Command,
    None,
}

impl Default for Stage {
    fn default() -> Self {
        Stage::None
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Plan => "plan",
            Stage::Retrieve => "retrieve",
            Stage::Edit => "edit",
            Stage::Test => "test",
            Stage::Repair => "repair",
            Stage::Command => "command",
            Stage::None => "none",
        };
        write!(f, "{s}")
    }
}

/// Actions gated by the mode/stage matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolAction {
    ReadFile,
    Retrieve,
    Plan,
    WriteFile,
    ExecuteCommand,
}

impl fmt::Display for ToolAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolAction::ReadFile => "read_file",
            ToolAction::Retrieve => "retrieve",
            ToolAction::Plan => "plan",
            ToolAction::WriteFile => "write_file",
            ToolAction::ExecuteCommand => "execute_command",
        };
        write!(f, "{s}")
    }
}

impl ToolAction {
    /// Whether `(mode, stage)` permits this action.
    ///
    /// Reads are unrestricted. Planning is confined to PLAN mode and the
    /// MISSION plan stage. Writes happen only while editing or repairing,
    /// command execution only while testing, repairing, or running commands.
    pub fn allowed_in(self, mode: Mode, stage: Stage) -> bool {
        match self {
            ToolAction::ReadFile | ToolAction::Retrieve => true,
            ToolAction::Plan => {
                mode == Mode::Plan || (mode == Mode::Mission && stage == Stage::Plan)
            }
            ToolAction::WriteFile => {
                mode == Mode::Mission && matches!(stage, Stage::Edit | Stage::Repair)
            }
            ToolAction::ExecuteCommand => {
                mode == Mode::Mission
                    && matches!(stage, Stage::Test | Stage::Repair | Stage::Command)
            }
        }
    }
}

/// Direction of a mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeShift {
    Escalation,
    Downgrade,
    Lateral,
}

impl Mode {
    fn rank(self) -> u8 {
        match self {
            Mode::Answer => 0,
            Mode::Plan => 1,
            Mode::Mission => 2,
        }
    }

    /// Classify a transition from `self` to `to`.
    ///
    /// `{ANSWER→PLAN, ANSWER→MISSION, PLAN→MISSION}` escalate, the reverse
    /// set downgrades, same-to-same is lateral.
    pub fn shift_to(self, to: Mode) -> ModeShift {
        use std::cmp::Ordering;
        match self.rank().cmp(&to.rank()) {
            Ordering::Less => ModeShift::Escalation,
            Ordering::Greater => ModeShift::Downgrade,
            Ordering::Equal => ModeShift::Lateral,
        }
    }
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod tests;
