// SPDX-License-Identifier: MIT

//! Cross-crate test doubles and builders, gated behind the `test-support`
//! feature so downstream crates can depend on `aeon-core` with
//! `features = ["test-support"]` in `[dev-dependencies]` instead of
//! duplicating fixtures.

use crate::background::BackgroundHandle;
use crate::clock::FakeClock;
use crate::hooks::HookContext;
use crate::id::UnitId;
use crate::manifest::Manifest;
use crate::unit::{HealthStatus, ServiceUnit, TaskUnit, UnitError};
use crate::LifecycleState;
use async_trait::async_trait;
use std::sync::Arc;

/// A task unit whose outcome is fixed at construction time, for tests that
/// only care about lifecycle wiring, not real work.
pub struct ScriptedTask {
    outcome: Result<serde_json::Value, String>,
}

impl ScriptedTask {
    pub fn succeeding(payload: serde_json::Value) -> Self {
        Self { outcome: Ok(payload) }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self { outcome: Err(reason.into()) }
    }
}

#[async_trait]
impl TaskUnit for ScriptedTask {
    async fn resolve(&self, _ctx: &mut HookContext) -> Result<serde_json::Value, UnitError> {
        self.outcome.clone().map_err(UnitError::failed)
    }
}

/// A service unit whose start/stop/health outcomes are fixed at
/// construction time.
pub struct ScriptedService {
    start_fails: bool,
    stop_fails: bool,
}

impl ScriptedService {
    pub fn healthy() -> Self {
        Self { start_fails: false, stop_fails: false }
    }

    pub fn failing_to_start() -> Self {
        Self { start_fails: true, stop_fails: false }
    }

    pub fn failing_to_stop() -> Self {
        Self { start_fails: false, stop_fails: true }
    }
}

#[async_trait]
impl ServiceUnit for ScriptedService {
    async fn start(&self, _ctx: &mut HookContext, _background: &mut BackgroundHandle) -> Result<(), UnitError> {
        if self.start_fails {
            return Err(UnitError::failed("scripted start failure"));
        }
        Ok(())
    }

    async fn stop(&self, _ctx: &mut HookContext) -> Result<(), UnitError> {
        if self.stop_fails {
            return Err(UnitError::failed("scripted stop failure"));
        }
        Ok(())
    }

    async fn health(&self, _ctx: &HookContext) -> Result<HealthStatus, UnitError> {
        Ok(HealthStatus::healthy())
    }
}

/// Build a bare-bones [`Manifest`] for a given id, task-flavored with no
/// dependencies — the common case in tests that only care about one other
/// axis (config, hooks, dependency edges).
pub fn bare_manifest(id: &str) -> Manifest {
    Manifest::builder().id(UnitId::parse(id).expect("valid test id")).build()
}

/// A [`HookContext`] backed by a [`FakeClock`] frozen at epoch zero, for
/// deterministic timestamp assertions.
pub fn fake_hook_context(id: &str, state: LifecycleState) -> HookContext {
    HookContext::new(UnitId::parse(id).expect("valid test id"), state, Arc::new(FakeClock::new()))
}
