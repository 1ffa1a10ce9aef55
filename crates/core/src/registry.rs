// SPDX-License-Identifier: MIT

//! The manifest registry (C1): a map from unit id to manifest plus the
//! constructed unit body and hook wiring. Read-only to every component but
//! the Orchestrator, which exclusively owns it.

use crate::error::CoreError;
use crate::hooks::HookSet;
use crate::id::UnitId;
use crate::manifest::Manifest;
use crate::unit::UnitBody;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// One fully-registered unit: its descriptor, its executable body, and
/// any hooks it wired up.
pub struct RegisteredUnit {
    pub manifest: Manifest,
    pub body: UnitBody,
    pub hooks: HookSet,
}

/// Thread-safe registry of [`RegisteredUnit`]s keyed by [`UnitId`].
///
/// Registration is idempotent for identical manifests (structural
/// equality); registering a different manifest under the same id is
/// `CoreError::DuplicateId`.
#[derive(Default)]
pub struct ManifestRegistry {
    units: RwLock<HashMap<UnitId, Arc<RegisteredUnit>>>,
}

impl ManifestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, unit: RegisteredUnit) -> Result<(), CoreError> {
        unit.manifest.validate()?;
        let mut units = self.units.write();
        if let Some(existing) = units.get(&unit.manifest.id) {
            if existing.manifest == unit.manifest {
                return Ok(());
            }
            return Err(CoreError::DuplicateId { id: unit.manifest.id.clone() });
        }
        units.insert(unit.manifest.id.clone(), Arc::new(unit));
        Ok(())
    }

    pub fn get(&self, id: &UnitId) -> Option<Arc<RegisteredUnit>> {
        self.units.read().get(id).cloned()
    }

    pub fn manifests(&self) -> Vec<Manifest> {
        self.units.read().values().map(|u| u.manifest.clone()).collect()
    }

    pub fn ids(&self) -> Vec<UnitId> {
        self.units.read().keys().cloned().collect()
    }

    pub fn contains(&self, id: &UnitId) -> bool {
        self.units.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.units.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::unit::{HealthStatus, ServiceUnit, TaskUnit, UnitError};
    use async_trait::async_trait;

    struct NoopTask;
    #[async_trait]
    impl TaskUnit for NoopTask {
        async fn resolve(&self, _ctx: &mut crate::hooks::HookContext) -> Result<serde_json::Value, UnitError> {
            Ok(serde_json::json!({"ok": true}))
        }
    }

    struct NoopService;
    #[async_trait]
    impl ServiceUnit for NoopService {
        async fn start(
            &self,
            _ctx: &mut crate::hooks::HookContext,
            _background: &mut crate::background::BackgroundHandle,
        ) -> Result<(), UnitError> {
            Ok(())
        }
        async fn stop(&self, _ctx: &mut crate::hooks::HookContext) -> Result<(), UnitError> {
            Ok(())
        }
        async fn health(&self, _ctx: &crate::hooks::HookContext) -> Result<HealthStatus, UnitError> {
            Ok(HealthStatus::healthy())
        }
    }

    fn registered(id: &str) -> RegisteredUnit {
        RegisteredUnit {
            manifest: Manifest::builder().id(UnitId::parse(id).unwrap()).build(),
            body: UnitBody::Task(Box::new(NoopTask)),
            hooks: HookSet::new(),
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        let registry = ManifestRegistry::new();
        registry.register(registered("g/n")).unwrap();
        let unit = registry.get(&UnitId::parse("g/n").unwrap()).unwrap();
        assert_eq!(unit.manifest.id.as_str(), "g/n");
    }

    #[test]
    fn duplicate_identical_manifest_is_idempotent() {
        let registry = ManifestRegistry::new();
        registry.register(registered("g/n")).unwrap();
        registry.register(registered("g/n")).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_different_manifest_errors() {
        let registry = ManifestRegistry::new();
        registry.register(registered("g/n")).unwrap();
        let mut different = registered("g/n");
        different.manifest.required = true;
        let err = registry.register(different).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId { .. }));
    }

    #[test]
    fn self_referencing_hard_dep_is_rejected_at_registration() {
        let registry = ManifestRegistry::new();
        let mut unit = registered("g/n");
        unit.manifest.hard_deps = vec![UnitId::parse("g/n").unwrap()];
        assert!(registry.register(unit).is_err());
    }

    #[test]
    fn service_flavored_unit_registers_too() {
        let registry = ManifestRegistry::new();
        let unit = RegisteredUnit {
            manifest: Manifest::builder()
                .id(UnitId::parse("svc/heartbeat").unwrap())
                .flavor(crate::manifest::UnitFlavor::Service)
                .build(),
            body: UnitBody::Service(Box::new(NoopService)),
            hooks: HookSet::new(),
        };
        registry.register(unit).unwrap();
        assert!(registry.contains(&UnitId::parse("svc/heartbeat").unwrap()));
    }
}
