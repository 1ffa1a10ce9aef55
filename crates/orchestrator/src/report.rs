// SPDX-License-Identifier: MIT

//! The `{id -> ok|error}` report shape every Orchestrator surface method
//! returns, plus the `status()` aggregate.

use aeon_core::{HealthStatus, LifecycleState, UnitId};
use std::collections::HashMap;

/// The outcome of driving one unit through a requested operation.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnitOutcome {
    Ok { state: LifecycleState },
    Error { message: String },
}

impl UnitOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, UnitOutcome::Ok { .. })
    }
}

/// `{id -> ok|error}` as returned by every public Orchestrator method.
pub type OperationReport = HashMap<UnitId, UnitOutcome>;

/// One unit's status snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModuleStatus {
    pub state: LifecycleState,
    pub required: bool,
}

/// The aggregate returned by `Orchestrator::status()`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusReport {
    pub running: bool,
    pub modules: HashMap<UnitId, ModuleStatus>,
    pub health: HashMap<UnitId, HealthOutcome>,
}

/// A per-unit health probe result: either a real [`HealthStatus`], a
/// timeout, or "not applicable" for task-flavored units (health calls run
/// with a 5s per-call timeout).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HealthOutcome {
    Healthy(HealthStatus),
    TimedOut,
    NotApplicable,
    Error(String),
}

/// One flow step's outcome, as recorded in the result document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failed,
}

/// A single `steps[]` entry in the result document written to
/// `outputs.result`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StepResult {
    pub id: String,
    pub action: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The `flags` sub-object of the result document's `meta`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResultFlags {
    pub cli_enabled: bool,
    pub web_enabled: bool,
}

/// The result document's `meta` object.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResultMeta {
    pub timestamp: String,
    pub root: String,
    pub mode: String,
    pub flags: ResultFlags,
    pub entry_path: String,
}

/// The result document written to the path an instruction document's
/// `outputs.result` names (default `runtime/last_result.json`).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResultDocument {
    pub meta: ResultMeta,
    pub warnings: Vec<String>,
    pub steps: Vec<StepResult>,
}

impl ResultDocument {
    /// True iff any step recorded a `failed` status — the run-level
    /// success signal a caller checks after a flow finishes.
    pub fn any_failed(&self) -> bool {
        self.steps.iter().any(|step| step.status == StepStatus::Failed)
    }
}
