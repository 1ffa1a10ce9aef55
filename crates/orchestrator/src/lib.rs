// SPDX-License-Identifier: MIT

//! The Orchestrator (C6).
//!
//! Ties the manifest registry, dependency resolver, config resolver,
//! state store, and lifecycle engine together behind one
//! `discover/register/load/start/stop/unload/reload/status/shutdown`
//! surface, scheduling each wave of the resolved dependency plan with
//! bounded concurrency.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod orchestrator;
mod report;

pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use report::{
    HealthOutcome, ModuleStatus, OperationReport, ResultDocument, ResultFlags, ResultMeta, StatusReport, StepResult,
    StepStatus, UnitOutcome,
};
