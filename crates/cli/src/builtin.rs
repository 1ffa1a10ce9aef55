// SPDX-License-Identifier: MIT

//! Static unit-body constructors, standing in for the source's
//! reflection-based discovery: a manifest names an id and a
//! flavor, and this registry hands back a generic body that logs its own
//! lifecycle calls. Real deployments register their own `TaskUnit`/
//! `ServiceUnit` implementations through [`aeon_orchestrator::Orchestrator::register`]
//! directly; this is the fallback for manifests discovered without one.

use aeon_core::{BackgroundHandle, HealthStatus, HookContext, ServiceUnit, TaskUnit, UnitBody, UnitError, UnitFlavor};
use async_trait::async_trait;

/// A task body that logs its invocation and resolves with a null payload.
/// Stands in for a unit discovered on disk with no registered body.
struct LoggingTask;

#[async_trait]
impl TaskUnit for LoggingTask {
    async fn resolve(&self, ctx: &mut HookContext) -> Result<serde_json::Value, UnitError> {
        tracing::info!(unit = %ctx.unit_id, "resolving (no body registered, using generic task stub)");
        Ok(serde_json::Value::Null)
    }
}

/// A service body that reports healthy and spawns no background work.
struct LoggingService;

#[async_trait]
impl ServiceUnit for LoggingService {
    async fn start(&self, ctx: &mut HookContext, _background: &mut BackgroundHandle) -> Result<(), UnitError> {
        tracing::info!(unit = %ctx.unit_id, "starting (no body registered, using generic service stub)");
        Ok(())
    }

    async fn stop(&self, ctx: &mut HookContext) -> Result<(), UnitError> {
        tracing::info!(unit = %ctx.unit_id, "stopping");
        Ok(())
    }

    async fn health(&self, _ctx: &HookContext) -> Result<HealthStatus, UnitError> {
        Ok(HealthStatus::healthy())
    }
}

/// Construct the generic body matching a manifest's declared flavor.
pub fn generic_body(flavor: UnitFlavor) -> UnitBody {
    match flavor {
        UnitFlavor::Task => UnitBody::Task(Box::new(LoggingTask)),
        UnitFlavor::Service => UnitBody::Service(Box::new(LoggingService)),
    }
}
