// SPDX-License-Identifier: MIT

//! The Lifecycle Engine (C5): drives one unit at a time through a single
//! transition, dispatching the manifest's declared hooks in the fixed
//! schedule order and enforcing capability checks, idempotence, and
//! cooperative cancellation of background activity.

use crate::error::EngineError;
use crate::outcome::LifecycleOutcome;
use aeon_core::{
    BackgroundHandle, HookContext, HookEvent, HookSet, LifecycleState, MetricsCollector, MetricsSnapshot,
    RegisteredUnit, SecurityContext, UnitError, UnitId,
};
use aeon_store::FileStateStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const STOP_GRACE_WINDOW: Duration = Duration::from_secs(5);

pub struct LifecycleEngine {
    store: Arc<FileStateStore>,
    metrics: RwLock<HashMap<UnitId, Arc<MetricsCollector>>>,
}

impl LifecycleEngine {
    pub fn new(store: Arc<FileStateStore>) -> Self {
        Self { store, metrics: RwLock::new(HashMap::new()) }
    }

    /// The in-process counter/gauge snapshot accumulated for `id`, or
    /// `None` if the engine has never driven a transition for it.
    pub fn metrics(&self, id: &UnitId) -> Option<MetricsSnapshot> {
        self.metrics.read().get(id).map(|m| m.snapshot())
    }

    fn metrics_for(&self, id: &UnitId) -> Arc<MetricsCollector> {
        if let Some(existing) = self.metrics.read().get(id) {
            return existing.clone();
        }
        self.metrics.write().entry(id.clone()).or_insert_with(|| Arc::new(MetricsCollector::new(id.as_str()))).clone()
    }

    fn check_capabilities(&self, unit: &RegisteredUnit, security: &SecurityContext) -> Result<(), EngineError> {
        if let Some(missing) = security.first_missing(&unit.manifest.required_permissions) {
            return Err(EngineError::CapabilityDenied { unit: unit.manifest.id.clone(), permission: missing });
        }
        Ok(())
    }

    /// `UNLOADED -> LOADED`: fires `on_load` only.
    pub async fn load(&self, unit: &RegisteredUnit, ctx: &mut HookContext) -> Result<LifecycleOutcome, EngineError> {
        self.check_capabilities(unit, &ctx.security.clone()).map_err(|err| {
            self.metrics_for(&unit.manifest.id).increment("errors_total", 1);
            err
        })?;
        dispatch_or_abort(&unit.hooks, HookEvent::OnLoad, ctx, serde_json::Value::Null, &unit.manifest.id).await?;
        self.store.put_state(unit.manifest.id.clone(), LifecycleState::Loaded)?;
        self.metrics_for(&unit.manifest.id).increment("transitions_total", 1);
        Ok(LifecycleOutcome::fresh(LifecycleState::Loaded, None))
    }

    /// `LOADED -> STARTED` (service flavor). Runs the full
    /// before_start/on_start/start/on_success|on_error schedule, honoring
    /// the idempotence short-circuit.
    pub async fn start(
        &self,
        unit: &RegisteredUnit,
        ctx: &mut HookContext,
        background: &mut BackgroundHandle,
    ) -> Result<LifecycleOutcome, EngineError> {
        if !unit.manifest.force_execute {
            if let Some(record) = self.store.get(&unit.manifest.id) {
                if record.state == LifecycleState::Started {
                    return Ok(LifecycleOutcome::cached(LifecycleState::Started, record.result));
                }
            }
        }

        let service = unit.body.as_service().ok_or_else(|| EngineError::InvalidTransition {
            unit: unit.manifest.id.clone(),
            from: LifecycleState::Loaded,
            to: LifecycleState::Started,
        })?;

        dispatch_or_abort(&unit.hooks, HookEvent::BeforeStart, ctx, serde_json::Value::Null, &unit.manifest.id).await?;
        dispatch_or_abort(&unit.hooks, HookEvent::OnStart, ctx, serde_json::Value::Null, &unit.manifest.id).await?;

        match service.start(ctx, background).await {
            Ok(()) => {
                dispatch_or_abort(&unit.hooks, HookEvent::OnSuccess, ctx, serde_json::Value::Null, &unit.manifest.id)
                    .await?;
                self.store.put_state(unit.manifest.id.clone(), LifecycleState::Started)?;
                self.metrics_for(&unit.manifest.id).increment("transitions_total", 1);
                Ok(LifecycleOutcome::fresh(LifecycleState::Started, None))
            }
            Err(source) => {
                let payload = serde_json::json!({"error": source.to_string()});
                dispatch(&unit.hooks, HookEvent::OnError, ctx, payload).await.ok();
                self.store.put_state(unit.manifest.id.clone(), LifecycleState::Failed)?;
                self.metrics_for(&unit.manifest.id).increment("errors_total", 1);
                Err(EngineError::UnitFailed { unit: unit.manifest.id.clone(), source })
            }
        }
    }

    /// `PENDING -> {RESOLVED,REJECTED,INCOMPLETE,BLOCKED}` (task flavor).
    /// Runs before_resolve/on_resolve/resolve/on_success|on_error and the
    /// guarded `after_resolve` cleanup.
    pub async fn resolve(&self, unit: &RegisteredUnit, ctx: &mut HookContext) -> Result<LifecycleOutcome, EngineError> {
        if !unit.manifest.force_execute {
            if let Some(record) = self.store.get(&unit.manifest.id) {
                if record.state == LifecycleState::Resolved {
                    return Ok(LifecycleOutcome::cached(LifecycleState::Resolved, record.result));
                }
            }
        }

        let task = unit.body.as_task().ok_or_else(|| EngineError::InvalidTransition {
            unit: unit.manifest.id.clone(),
            from: LifecycleState::Pending,
            to: LifecycleState::Resolved,
        })?;

        dispatch_or_abort(&unit.hooks, HookEvent::BeforeResolve, ctx, serde_json::Value::Null, &unit.manifest.id)
            .await?;
        dispatch_or_abort(&unit.hooks, HookEvent::OnResolve, ctx, serde_json::Value::Null, &unit.manifest.id).await?;

        let outcome = match task.resolve(ctx).await {
            Ok(payload) => {
                dispatch_or_abort(&unit.hooks, HookEvent::OnSuccess, ctx, payload.clone(), &unit.manifest.id).await?;
                self.store.put_state(unit.manifest.id.clone(), LifecycleState::Resolved)?;
                self.store.put_result(unit.manifest.id.clone(), payload.clone())?;
                self.metrics_for(&unit.manifest.id).increment("transitions_total", 1);
                Ok(LifecycleOutcome::fresh(LifecycleState::Resolved, Some(payload)))
            }
            Err(source) => {
                let payload = serde_json::json!({"error": source.to_string()});
                dispatch(&unit.hooks, HookEvent::OnError, ctx, payload).await.ok();
                self.store.put_state(unit.manifest.id.clone(), LifecycleState::Failed)?;
                self.metrics_for(&unit.manifest.id).increment("errors_total", 1);
                Err(EngineError::UnitFailed { unit: unit.manifest.id.clone(), source })
            }
        };

        // Guarded cleanup: failures here are logged, never override the
        // already-determined outcome.
        if let Err(hook_err) = dispatch(&unit.hooks, HookEvent::AfterResolve, ctx, serde_json::Value::Null).await {
            tracing::error!(unit = %unit.manifest.id, error = %hook_err, "after_resolve hook failed");
        }

        outcome
    }

    /// `STARTED -> STOPPED` (service flavor). Calls `stop`, cancels
    /// tracked background activity with a 5s grace window, then runs the
    /// guarded `after_stop` cleanup.
    pub async fn stop(
        &self,
        unit: &RegisteredUnit,
        ctx: &mut HookContext,
        mut background: BackgroundHandle,
    ) -> Result<LifecycleOutcome, EngineError> {
        let service = unit.body.as_service().ok_or_else(|| EngineError::InvalidTransition {
            unit: unit.manifest.id.clone(),
            from: LifecycleState::Started,
            to: LifecycleState::Stopped,
        })?;

        let stop_result = service.stop(ctx).await;

        background.cancel.cancel();
        if tokio::time::timeout(STOP_GRACE_WINDOW, background.tasks.join_all()).await.is_err() {
            tracing::warn!(unit = %unit.manifest.id, "background activity did not stop within grace window");
        }

        let outcome = match stop_result {
            Ok(()) => {
                self.store.put_state(unit.manifest.id.clone(), LifecycleState::Stopped)?;
                self.metrics_for(&unit.manifest.id).increment("transitions_total", 1);
                Ok(LifecycleOutcome::fresh(LifecycleState::Stopped, None))
            }
            Err(source) => {
                self.store.put_state(unit.manifest.id.clone(), LifecycleState::Failed)?;
                self.metrics_for(&unit.manifest.id).increment("errors_total", 1);
                Err(EngineError::UnitFailed { unit: unit.manifest.id.clone(), source })
            }
        };

        if let Err(hook_err) = dispatch(&unit.hooks, HookEvent::AfterStop, ctx, serde_json::Value::Null).await {
            tracing::error!(unit = %unit.manifest.id, error = %hook_err, "after_stop hook failed");
        }

        outcome
    }

    /// `{STOPPED,FAILED,RESOLVED,REJECTED,INCOMPLETE,BLOCKED} -> UNLOADED`.
    /// No hooks are declared for this transition.
    pub fn unload(&self, unit: &RegisteredUnit) -> Result<LifecycleOutcome, EngineError> {
        self.store.put_state(unit.manifest.id.clone(), LifecycleState::Unloaded)?;
        self.metrics_for(&unit.manifest.id).increment("transitions_total", 1);
        Ok(LifecycleOutcome::fresh(LifecycleState::Unloaded, None))
    }
}

async fn dispatch(
    hooks: &HookSet,
    event: HookEvent,
    ctx: &mut HookContext,
    payload: serde_json::Value,
) -> Result<serde_json::Value, UnitError> {
    match hooks.get(event) {
        None => Ok(payload),
        Some(hook) => hook(ctx, payload).await,
    }
}

/// `dispatch`, mapping a hook failure to an [`EngineError::UnitFailed`]
/// attributed to `unit` — used for the hooks that may abort a transition
/// (`before_*`, `on_*`), as opposed to the guarded cleanup hooks whose
/// failures are only logged.
async fn dispatch_or_abort(
    hooks: &HookSet,
    event: HookEvent,
    ctx: &mut HookContext,
    payload: serde_json::Value,
    unit: &aeon_core::UnitId,
) -> Result<serde_json::Value, EngineError> {
    dispatch(hooks, event, ctx, payload)
        .await
        .map_err(|source| EngineError::UnitFailed { unit: unit.clone(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeon_core::test_support::{bare_manifest, fake_hook_context, ScriptedService, ScriptedTask};
    use aeon_core::{HookFuture, SecurityContext, UnitBody};
    use std::sync::Arc;

    fn task_unit(id: &str, task: ScriptedTask) -> RegisteredUnit {
        RegisteredUnit { manifest: bare_manifest(id), body: UnitBody::Task(Box::new(task)), hooks: HookSet::new() }
    }

    fn service_unit(id: &str, svc: ScriptedService) -> RegisteredUnit {
        let mut manifest = bare_manifest(id);
        manifest.flavor = aeon_core::UnitFlavor::Service;
        RegisteredUnit { manifest, body: UnitBody::Service(Box::new(svc)), hooks: HookSet::new() }
    }

    fn temp_engine() -> (tempfile::TempDir, LifecycleEngine) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStateStore::open(dir.path().join("state.json")).unwrap());
        (dir, LifecycleEngine::new(store))
    }

    #[tokio::test]
    async fn full_service_cycle_reaches_stopped() {
        let (_dir, engine) = temp_engine();
        let unit = service_unit("g/svc", ScriptedService::healthy());
        let mut ctx = fake_hook_context("g/svc", LifecycleState::Unloaded);

        let loaded = engine.load(&unit, &mut ctx).await.unwrap();
        assert_eq!(loaded.state, LifecycleState::Loaded);

        let mut background = BackgroundHandle::new();
        let started = engine.start(&unit, &mut ctx, &mut background).await.unwrap();
        assert_eq!(started.state, LifecycleState::Started);
        assert!(!started.short_circuited);

        let stopped = engine.stop(&unit, &mut ctx, background).await.unwrap();
        assert_eq!(stopped.state, LifecycleState::Stopped);

        let unloaded = engine.unload(&unit).unwrap();
        assert_eq!(unloaded.state, LifecycleState::Unloaded);
    }

    #[tokio::test]
    async fn full_task_cycle_reaches_resolved_with_payload() {
        let (_dir, engine) = temp_engine();
        let unit = task_unit("g/task", ScriptedTask::succeeding(serde_json::json!({"n": 1})));
        let mut ctx = fake_hook_context("g/task", LifecycleState::Unloaded);

        engine.load(&unit, &mut ctx).await.unwrap();
        let resolved = engine.resolve(&unit, &mut ctx).await.unwrap();
        assert_eq!(resolved.state, LifecycleState::Resolved);
        assert_eq!(resolved.payload, Some(serde_json::json!({"n": 1})));

        let unloaded = engine.unload(&unit).unwrap();
        assert_eq!(unloaded.state, LifecycleState::Unloaded);
    }

    #[tokio::test]
    async fn resolve_short_circuits_once_already_resolved() {
        let (_dir, engine) = temp_engine();
        let unit = task_unit("g/task", ScriptedTask::succeeding(serde_json::json!({"first": true})));
        let mut ctx = fake_hook_context("g/task", LifecycleState::Unloaded);

        let first = engine.resolve(&unit, &mut ctx).await.unwrap();
        assert!(!first.short_circuited);

        let second = engine.resolve(&unit, &mut ctx).await.unwrap();
        assert!(second.short_circuited);
        assert_eq!(second.payload, Some(serde_json::json!({"first": true})));
    }

    #[tokio::test]
    async fn force_execute_bypasses_the_short_circuit() {
        let (_dir, engine) = temp_engine();
        let mut unit = task_unit("g/task", ScriptedTask::succeeding(serde_json::json!({"v": 1})));
        unit.manifest.force_execute = true;

        engine.resolve(&unit, &mut fake_hook_context("g/task", LifecycleState::Unloaded)).await.unwrap();
        let second = engine.resolve(&unit, &mut fake_hook_context("g/task", LifecycleState::Unloaded)).await.unwrap();
        assert!(!second.short_circuited);
    }

    #[tokio::test]
    async fn missing_permission_denies_load() {
        let (_dir, engine) = temp_engine();
        let mut manifest = bare_manifest("g/secure");
        manifest.required_permissions = vec!["admin".to_string()];
        let unit = RegisteredUnit {
            manifest,
            body: UnitBody::Task(Box::new(ScriptedTask::succeeding(serde_json::Value::Null))),
            hooks: HookSet::new(),
        };
        let mut ctx = fake_hook_context("g/secure", LifecycleState::Unloaded)
            .with_security(SecurityContext::new("caller", Vec::new()));

        let err = engine.load(&unit, &mut ctx).await.unwrap_err();
        assert!(matches!(err, EngineError::CapabilityDenied { .. }));
    }

    #[tokio::test]
    async fn unrestricted_caller_passes_capability_check() {
        let (_dir, engine) = temp_engine();
        let mut manifest = bare_manifest("g/secure");
        manifest.required_permissions = vec!["admin".to_string()];
        let unit = RegisteredUnit {
            manifest,
            body: UnitBody::Task(Box::new(ScriptedTask::succeeding(serde_json::Value::Null))),
            hooks: HookSet::new(),
        };
        let mut ctx = fake_hook_context("g/secure", LifecycleState::Unloaded);

        assert!(engine.load(&unit, &mut ctx).await.is_ok());
    }

    #[tokio::test]
    async fn failing_task_transitions_to_failed_and_fires_on_error() {
        let (_dir, engine) = temp_engine();
        let order: Arc<parking_lot::Mutex<Vec<&'static str>>> = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let record = order.clone();
        let hooks = HookSet::new().with(
            HookEvent::OnError,
            Arc::new(move |_ctx, payload| {
                record.lock().push("on_error");
                let fut: HookFuture = Box::pin(async move { Ok(payload) });
                fut
            }),
        );
        let unit = RegisteredUnit {
            manifest: bare_manifest("g/task"),
            body: UnitBody::Task(Box::new(ScriptedTask::failing("boom"))),
            hooks,
        };
        let mut ctx = fake_hook_context("g/task", LifecycleState::Unloaded);

        let err = engine.resolve(&unit, &mut ctx).await.unwrap_err();
        assert!(matches!(err, EngineError::UnitFailed { .. }));
        assert_eq!(order.lock().as_slice(), ["on_error"]);
    }

    #[tokio::test]
    async fn failing_service_start_transitions_to_failed() {
        let (_dir, engine) = temp_engine();
        let unit = service_unit("g/svc", ScriptedService::failing_to_start());
        let mut ctx = fake_hook_context("g/svc", LifecycleState::Unloaded);
        let mut background = BackgroundHandle::new();

        let err = engine.start(&unit, &mut ctx, &mut background).await.unwrap_err();
        assert!(matches!(err, EngineError::UnitFailed { .. }));
    }

    #[tokio::test]
    async fn hook_schedule_runs_in_declared_order_for_a_task() {
        let (_dir, engine) = temp_engine();
        let order: Arc<parking_lot::Mutex<Vec<&'static str>>> = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let record = |label: &'static str, log: Arc<parking_lot::Mutex<Vec<&'static str>>>| {
            Arc::new(move |_ctx: &mut HookContext, payload: serde_json::Value| {
                log.lock().push(label);
                let fut: HookFuture = Box::pin(async move { Ok(payload) });
                fut
            })
        };

        let hooks = HookSet::new()
            .with(HookEvent::BeforeResolve, record("before_resolve", order.clone()))
            .with(HookEvent::OnResolve, record("on_resolve", order.clone()))
            .with(HookEvent::OnSuccess, record("on_success", order.clone()))
            .with(HookEvent::AfterResolve, record("after_resolve", order.clone()));

        let unit = RegisteredUnit {
            manifest: bare_manifest("g/task"),
            body: UnitBody::Task(Box::new(ScriptedTask::succeeding(serde_json::Value::Null))),
            hooks,
        };
        let mut ctx = fake_hook_context("g/task", LifecycleState::Unloaded);

        engine.resolve(&unit, &mut ctx).await.unwrap();
        assert_eq!(
            order.lock().as_slice(),
            ["before_resolve", "on_resolve", "on_success", "after_resolve"]
        );
    }

    #[tokio::test]
    async fn metrics_track_transitions_and_errors_independently_per_unit() {
        let (_dir, engine) = temp_engine();
        let ok_unit = task_unit("g/ok", ScriptedTask::succeeding(serde_json::Value::Null));
        let bad_unit = task_unit("g/bad", ScriptedTask::failing("boom"));

        engine.load(&ok_unit, &mut fake_hook_context("g/ok", LifecycleState::Unloaded)).await.unwrap();
        engine.resolve(&ok_unit, &mut fake_hook_context("g/ok", LifecycleState::Unloaded)).await.unwrap();
        engine.resolve(&bad_unit, &mut fake_hook_context("g/bad", LifecycleState::Unloaded)).await.unwrap_err();

        let ok_snapshot = engine.metrics(&ok_unit.manifest.id).unwrap();
        assert_eq!(ok_snapshot.counters.get("transitions_total"), Some(&2));
        assert_eq!(ok_snapshot.counters.get("errors_total"), None);

        let bad_snapshot = engine.metrics(&bad_unit.manifest.id).unwrap();
        assert_eq!(bad_snapshot.counters.get("errors_total"), Some(&1));

        assert!(engine.metrics(&UnitId::parse("g/never-touched").unwrap()).is_none());
    }

    #[tokio::test]
    async fn stop_cancels_background_activity_within_grace_window() {
        let (_dir, engine) = temp_engine();
        let unit = service_unit("g/svc", ScriptedService::healthy());
        let mut ctx = fake_hook_context("g/svc", LifecycleState::Unloaded);
        let mut background = BackgroundHandle::new();

        let cancel = background.cancel.clone();
        background.tasks.spawn(async move {
            cancel.cancelled().await;
        });

        engine.start(&unit, &mut ctx, &mut background).await.unwrap();
        let stopped = engine.stop(&unit, &mut ctx, background).await.unwrap();
        assert_eq!(stopped.state, LifecycleState::Stopped);
    }
}
