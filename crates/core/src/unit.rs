// SPDX-License-Identifier: MIT

//! Unit bodies: the `resolve` (task) or `start`/`stop`/`health` (service)
//! behavior a unit implements, separate from its declarative [`crate::manifest::Manifest`]
//! and its optional [`crate::hooks::HookSet`].

use crate::background::BackgroundHandle;
use crate::hooks::HookContext;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("{0}")]
    Failed(String),
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
}

impl UnitError {
    pub fn failed(msg: impl Into<String>) -> Self {
        UnitError::Failed(msg.into())
    }
}

/// Liveness/readiness snapshot returned by [`ServiceUnit::health`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthStatus {
    pub ready: bool,
    pub live: bool,
    pub details: serde_json::Value,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self { ready: true, live: true, details: serde_json::Value::Null }
    }

    pub fn unhealthy(details: serde_json::Value) -> Self {
        Self { ready: false, live: false, details }
    }
}

/// A one-shot unit: executes `resolve` exactly once per (non-idempotent)
/// run and produces a result payload.
#[async_trait]
pub trait TaskUnit: Send + Sync {
    async fn resolve(&self, ctx: &mut HookContext) -> Result<serde_json::Value, UnitError>;
}

/// A long-running unit: `start` spawns its work onto `background` (tracked
/// so `stop` can cancel it cooperatively and await it within the engine's
/// grace window), `stop` cancels it cooperatively, `health` reports
/// liveness/readiness on demand.
#[async_trait]
pub trait ServiceUnit: Send + Sync {
    async fn start(&self, ctx: &mut HookContext, background: &mut BackgroundHandle) -> Result<(), UnitError>;
    async fn stop(&self, ctx: &mut HookContext) -> Result<(), UnitError>;
    async fn health(&self, ctx: &HookContext) -> Result<HealthStatus, UnitError>;
}

/// The executable half of a registered unit: exactly one of the two
/// flavors named in [`crate::manifest::UnitFlavor`].
pub enum UnitBody {
    Task(Box<dyn TaskUnit>),
    Service(Box<dyn ServiceUnit>),
}

impl UnitBody {
    pub fn as_task(&self) -> Option<&dyn TaskUnit> {
        match self {
            UnitBody::Task(t) => Some(t.as_ref()),
            UnitBody::Service(_) => None,
        }
    }

    pub fn as_service(&self) -> Option<&dyn ServiceUnit> {
        match self {
            UnitBody::Service(s) => Some(s.as_ref()),
            UnitBody::Task(_) => None,
        }
    }
}
