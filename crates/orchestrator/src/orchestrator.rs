// SPDX-License-Identifier: MIT

//! The Orchestrator (C6): top-level controller.
//!
//! Owns the manifest registry, one [`FileStateStore`] handle, one
//! [`ConfigResolver`], and a [`DependencyPlan`] resolved once from the
//! registry and cached until the next registration invalidates it.
//! Grounded in `oj-daemon`'s top-level runtime loop shape and
//! `original_source/.../daemon.py::UniversalDaemon`.

use crate::error::OrchestratorError;
use crate::report::{HealthOutcome, ModuleStatus, OperationReport, StatusReport, UnitOutcome};
use aeon_config::ConfigResolver;
use aeon_core::{
    HookContext, HookSet, LifecycleState, Manifest, ManifestRegistry, RegisteredUnit, SecurityContext, SystemClock,
    UnitBody, UnitId,
};
use aeon_depgraph::{DependencyPlan, GraphBuilder};
use aeon_engine::{BackgroundHandle, LifecycleEngine};
use aeon_store::FileStateStore;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default wave fan-out: the number of logical cores.
fn default_concurrency() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

pub struct Orchestrator {
    registry: Arc<ManifestRegistry>,
    store: Arc<FileStateStore>,
    config: Arc<ConfigResolver>,
    engine: Arc<LifecycleEngine>,
    plan: Arc<RwLock<Option<DependencyPlan>>>,
    backgrounds: Arc<Mutex<HashMap<UnitId, BackgroundHandle>>>,
    security: SecurityContext,
    concurrency: usize,
}

impl Orchestrator {
    pub fn new(store: Arc<FileStateStore>, config: Arc<ConfigResolver>) -> Self {
        Self {
            registry: Arc::new(ManifestRegistry::new()),
            engine: Arc::new(LifecycleEngine::new(store.clone())),
            store,
            config,
            plan: Arc::new(RwLock::new(None)),
            backgrounds: Arc::new(Mutex::new(HashMap::new())),
            security: SecurityContext::unrestricted(),
            concurrency: default_concurrency(),
        }
    }

    pub fn with_security(mut self, security: SecurityContext) -> Self {
        self.security = security;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn config(&self) -> &Arc<ConfigResolver> {
        &self.config
    }

    pub fn store(&self) -> &Arc<FileStateStore> {
        &self.store
    }

    /// The Lifecycle Engine's in-process counter/gauge snapshot for `id`,
    /// independent of `status()`'s durable `{running, modules, health}`
    /// contract.
    pub fn metrics(&self, id: &UnitId) -> Option<aeon_core::MetricsSnapshot> {
        self.engine.metrics(id)
    }

    /// `discover(packages) -> [manifest]`. Scans one or more
    /// directories for manifest documents; does not register unit bodies
    /// — constructing a [`UnitBody`] for a discovered id is the caller's
    /// job.
    pub fn discover(&self, packages: &[impl AsRef<Path>]) -> Result<Vec<Manifest>, OrchestratorError> {
        let mut manifests = Vec::new();
        for dir in packages {
            let result = aeon_manifest::discover_dir(dir.as_ref())?;
            for (path, err) in &result.skipped {
                tracing::warn!(path = %path.display(), error = %err, "skipping invalid manifest document");
            }
            manifests.extend(result.manifests);
        }
        Ok(manifests)
    }

    /// Register one fully-constructed unit (manifest + body + hooks),
    /// seeding its `config_keys` defaults into the Config Resolver and
    /// invalidating any cached dependency plan.
    pub fn register(&self, manifest: Manifest, body: UnitBody, hooks: HookSet) -> Result<(), OrchestratorError> {
        let mut defaults = HashMap::new();
        for (key, def) in &manifest.config_keys {
            if let Some(value) = aeon_config::ConfigValue::from_json(&def.default) {
                if let Ok(coerced) = value.coerce(def.declared_type) {
                    defaults.insert(key.clone(), coerced);
                }
            }
        }
        self.config.register_unit_defaults(manifest.id.clone(), defaults);
        self.registry.register(RegisteredUnit { manifest, body, hooks })?;
        *self.plan.write() = None;
        Ok(())
    }

    pub fn manifests(&self) -> Vec<Manifest> {
        self.registry.manifests()
    }

    /// Resolve (and cache) the dependency plan from every currently
    /// registered manifest.
    pub fn resolve_plan(&self) -> Result<DependencyPlan, OrchestratorError> {
        let manifests = self.registry.manifests();
        let plan = GraphBuilder::from_manifests(manifests).resolve()?;
        for warning in &plan.warnings {
            tracing::warn!(%warning, "dependency resolution warning");
        }
        *self.plan.write() = Some(plan.clone());
        Ok(plan)
    }

    fn plan(&self) -> Result<DependencyPlan, OrchestratorError> {
        if let Some(plan) = self.plan.read().clone() {
            return Ok(plan);
        }
        self.resolve_plan()
    }

    fn target_set(&self, ids: Option<&[UnitId]>) -> HashSet<UnitId> {
        match ids {
            Some(ids) => ids.iter().cloned().collect(),
            None => self.registry.ids().into_iter().collect(),
        }
    }

    fn fresh_context(&self, id: &UnitId, state: LifecycleState) -> HookContext {
        HookContext::new(id.clone(), state, Arc::new(SystemClock)).with_security(self.security.clone())
    }

    /// Drive every targeted unit through `load` (`UNLOADED -> LOADED`),
    /// wave by wave, with bounded fan-out within a wave.
    pub async fn load(&self, ids: Option<&[UnitId]>) -> Result<OperationReport, OrchestratorError> {
        let plan = self.plan()?;
        let targets = self.target_set(ids);
        self.run_waves(&plan.waves, &targets, |engine, unit, mut ctx| async move {
            engine.load(&unit, &mut ctx).await.map(|o| o.state)
        })
        .await
    }

    /// Drive every targeted unit through `start`/`resolve` depending on
    /// flavor (`LOADED -> STARTED` / `PENDING -> RESOLVED`).
    pub async fn start(&self, ids: Option<&[UnitId]>) -> Result<OperationReport, OrchestratorError> {
        let plan = self.plan()?;
        let targets = self.target_set(ids);
        let backgrounds = self.backgrounds.clone();
        self.run_waves(&plan.waves, &targets, move |engine, unit, mut ctx| {
            let backgrounds = backgrounds.clone();
            async move {
                if unit.body.as_service().is_some() {
                    let mut background = BackgroundHandle::new();
                    let outcome = engine.start(&unit, &mut ctx, &mut background).await;
                    if outcome.is_ok() {
                        backgrounds.lock().insert(unit.manifest.id.clone(), background);
                    }
                    outcome.map(|o| o.state)
                } else {
                    engine.resolve(&unit, &mut ctx).await.map(|o| o.state)
                }
            }
        })
        .await
    }

    /// Drive every targeted unit through `stop` (`STARTED -> STOPPED`),
    /// in reverse load order. Task-flavored
    /// units have no `stop` transition and are left untouched.
    pub async fn stop(&self, ids: Option<&[UnitId]>, timeout: Duration) -> Result<OperationReport, OrchestratorError> {
        let plan = self.plan()?;
        let service_targets: HashSet<UnitId> = self
            .target_set(ids)
            .into_iter()
            .filter(|id| self.registry.get(id).map(|u| u.body.as_service().is_some()).unwrap_or(false))
            .collect();
        let reversed: Vec<Vec<UnitId>> = plan.waves.iter().rev().cloned().collect();
        let backgrounds = self.backgrounds.clone();
        let fut = self.run_waves(&reversed, &service_targets, move |engine, unit, mut ctx| {
            let backgrounds = backgrounds.clone();
            async move {
                let background = backgrounds.lock().remove(&unit.manifest.id).unwrap_or_default();
                engine.stop(&unit, &mut ctx, background).await.map(|o| o.state)
            }
        });
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(?timeout, "stop() exceeded its overall timeout budget");
                Ok(self.snapshot_report(&service_targets))
            }
        }
    }

    /// Drive every targeted unit through `unload`
    /// (`{STOPPED,FAILED,...} -> UNLOADED`), in reverse load order.
    pub async fn unload(&self, ids: Option<&[UnitId]>) -> Result<OperationReport, OrchestratorError> {
        let plan = self.plan()?;
        let targets = self.target_set(ids);
        let reversed: Vec<Vec<UnitId>> = plan.waves.iter().rev().cloned().collect();
        self.run_waves(&reversed, &targets, |engine, unit, _ctx| async move {
            engine.unload(&unit).map(|o| o.state)
        })
        .await
    }

    /// `reload(id, strategy="graceful")`: stop -> unload -> load -> start,
    /// only if the manifest allows hot unload.
    pub async fn reload(&self, id: &UnitId, timeout: Duration) -> Result<(), OrchestratorError> {
        let unit = self.registry.get(id).ok_or_else(|| OrchestratorError::UnknownUnit { id: id.clone() })?;
        if !unit.manifest.hot_unload_allowed {
            return Err(OrchestratorError::HotUnloadDisallowed { id: id.clone() });
        }
        let ids = [id.clone()];
        self.stop(Some(&ids), timeout).await?;
        self.unload(Some(&ids)).await?;
        self.load(Some(&ids)).await?;
        self.start(Some(&ids)).await?;
        Ok(())
    }

    /// `status() -> {running, modules, health}`, with a 5s
    /// per-unit timeout on `health()`.
    pub async fn status(&self) -> StatusReport {
        const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
        let mut modules = HashMap::new();
        let mut health = HashMap::new();
        let mut running = false;

        for manifest in self.registry.manifests() {
            let state = self.store.get(&manifest.id).map(|r| r.state).unwrap_or(LifecycleState::Unloaded);
            if state == LifecycleState::Started {
                running = true;
            }
            modules.insert(manifest.id.clone(), ModuleStatus { state, required: manifest.required });

            let Some(unit) = self.registry.get(&manifest.id) else { continue };
            let outcome = match unit.body.as_service() {
                None => HealthOutcome::NotApplicable,
                Some(service) => {
                    let ctx = self.fresh_context(&manifest.id, state);
                    match tokio::time::timeout(HEALTH_TIMEOUT, service.health(&ctx)).await {
                        Ok(Ok(status)) => HealthOutcome::Healthy(status),
                        Ok(Err(err)) => HealthOutcome::Error(err.to_string()),
                        Err(_) => HealthOutcome::TimedOut,
                    }
                }
            };
            health.insert(manifest.id, outcome);
        }

        StatusReport { running, modules, health }
    }

    /// `shutdown(timeout)`: stop then unload all, splitting the budget
    /// 60/40. State is already durable after every `put_*`, so no
    /// additional persistence step is needed before returning.
    pub async fn shutdown(&self, timeout: Duration) -> Result<OperationReport, OrchestratorError> {
        let stop_budget = timeout.mul_f64(0.6);
        let unload_budget = timeout.saturating_sub(stop_budget);

        let mut report = self.stop(None, stop_budget).await?;
        let unload_report = tokio::time::timeout(unload_budget, self.unload(None)).await;
        match unload_report {
            Ok(Ok(r)) => report.extend(r),
            Ok(Err(err)) => return Err(err),
            Err(_) => tracing::warn!(?unload_budget, "unload() exceeded its shutdown budget"),
        }
        Ok(report)
    }

    /// True iff any `required` unit's outcome in `report` is an error, or
    /// is currently `FAILED` in the store.
    pub fn run_failed(&self, report: &OperationReport) -> bool {
        for manifest in self.registry.manifests() {
            if !manifest.required {
                continue;
            }
            let failed_in_report = matches!(report.get(&manifest.id), Some(UnitOutcome::Error { .. }));
            let failed_in_store =
                self.store.get(&manifest.id).map(|r| r.state == LifecycleState::Failed).unwrap_or(false);
            if failed_in_report || failed_in_store {
                return true;
            }
        }
        false
    }

    fn snapshot_report(&self, targets: &HashSet<UnitId>) -> OperationReport {
        targets
            .iter()
            .filter_map(|id| {
                self.store
                    .get(id)
                    .map(|record| (id.clone(), UnitOutcome::Ok { state: record.state }))
            })
            .collect()
    }

    /// Run one transition (`step`) over every targeted unit in `waves`,
    /// wave by wave: within a wave, units run concurrently bounded by
    /// `self.concurrency` permits; a unit whose hard dep already failed
    /// this run is marked `FAILED` without invocation.
    async fn run_waves<F, Fut>(
        &self,
        waves: &[Vec<UnitId>],
        targets: &HashSet<UnitId>,
        step: F,
    ) -> Result<OperationReport, OrchestratorError>
    where
        F: Fn(Arc<LifecycleEngine>, Arc<RegisteredUnit>, HookContext) -> Fut + Send + Sync + 'static + Clone,
        Fut: std::future::Future<Output = Result<LifecycleState, aeon_engine::EngineError>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut report: OperationReport = HashMap::new();
        let mut run_failed: HashSet<UnitId> = HashSet::new();

        for wave in waves {
            let mut handles = Vec::new();
            for id in wave {
                if !targets.contains(id) {
                    continue;
                }
                let Some(unit) = self.registry.get(id) else { continue };

                let blocked = unit.manifest.hard_deps.iter().any(|dep| run_failed.contains(dep));
                if blocked {
                    let _ = self.store.put_state(id.clone(), LifecycleState::Failed);
                    report.insert(id.clone(), UnitOutcome::Error { message: "hard dependency failed".to_string() });
                    run_failed.insert(id.clone());
                    continue;
                }

                let engine = self.engine.clone();
                let current_state = self.store.get(id).map(|r| r.state).unwrap_or(LifecycleState::Unloaded);
                let ctx = self.fresh_context(id, current_state);
                let step = step.clone();
                let semaphore = semaphore.clone();
                let id = id.clone();

                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    let result = step(engine, unit, ctx).await;
                    (id, result)
                }));
            }

            for handle in handles {
                match handle.await {
                    Ok((id, Ok(state))) => {
                        report.insert(id, UnitOutcome::Ok { state });
                    }
                    Ok((id, Err(err))) => {
                        let _ = self.store.put_state(id.clone(), LifecycleState::Failed);
                        report.insert(id.clone(), UnitOutcome::Error { message: err.to_string() });
                        run_failed.insert(id);
                    }
                    Err(join_err) => {
                        tracing::error!(error = %join_err, "lifecycle task panicked");
                    }
                }
            }
        }

        Ok(report)
    }
}
