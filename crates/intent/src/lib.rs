// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pilot-intent: deterministic prompt classification.
//!
//! Maps a free-form prompt plus run context to a behavior, a derived
//! permission mode, detected scope, resolved references, and (when signals
//! tie) a clarification request. Everything here is pure string analysis;
//! no I/O and no model calls.

mod analysis;
mod clarify;
mod command_intent;
mod context;
mod references;
mod router;
mod scope_detect;
mod signals;

pub use analysis::{Clarification, ContextSource, IntentAnalysis};
pub use clarify::MAX_CLARIFICATION_ATTEMPTS;
pub use command_intent::{detect_command_intent, CommandIntent};
pub use context::{has_active_run, RouterContext};
pub use references::{explicit_paths, resolve_references, ReferenceResolution};
pub use router::IntentRouter;
pub use scope_detect::{assess_scope, DetectedScope, ScopeAssessment};
pub use signals::{dominance, score_signals, Dominance, SignalScores};
