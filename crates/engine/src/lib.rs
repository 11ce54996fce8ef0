// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pilot-engine: mode enforcement, task lifecycle, the approval gate, the
//! scope contract, and the tool executor.

pub mod approval;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod memory;
pub mod mode;
pub mod plan_size;
pub mod publish;
pub mod redact;
pub mod repair;
pub mod scope;

pub use approval::ApprovalManager;
pub use error::EngineError;
pub use executor::{
    ToolExecutor, ToolHost, ToolHostError, ToolInvocation, ToolOutput, ToolRunResult,
};
pub use lifecycle::{LifecycleController, PlanningOutcome};
pub use memory::{MemoryService, ScoredSolution};
pub use mode::{ActionCheck, ModeChange, ModeManager};
pub use plan_size::{assess_plan, PlanSizeMetrics, PlanSizeReport};
pub use publish::EventPublisher;
pub use redact::redact_inputs;
pub use repair::RepairTracker;
pub use scope::{validate_action, ScopeCheck, ScopeManager, ScopeRequest};

#[cfg(any(test, feature = "test-support"))]
pub use executor::FakeToolHost;
#[cfg(any(test, feature = "test-support"))]
pub use publish::MemoryPublisher;
