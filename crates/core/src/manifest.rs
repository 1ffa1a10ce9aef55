// SPDX-License-Identifier: MIT

//! The manifest descriptor (C1): an immutable, read-only-to-everyone-else
//! record of one unit's identity, dependencies, declared config, required
//! capabilities, and hook wiring.

use crate::error::CoreError;
use crate::hooks::HookEvent;
use crate::id::UnitId;
use std::collections::HashMap;

/// Whether a unit is a long-running service (`start`/`stop`) or a one-shot
/// task (`resolve`). Every unit implementation models one or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitFlavor {
    Service,
    Task,
}

/// The declared type of a config key's value, used for coercion by the
/// Config Resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigValueKind {
    Bool,
    Int,
    Float,
    String,
}

/// One entry in a manifest's `config_keys` mapping: the unit default and
/// its declared type.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConfigKeyDef {
    pub declared_type: ConfigValueKind,
    pub default: serde_json::Value,
}

/// Advisory CPU/memory/thread hints. Never enforced by the engine —
/// purely informational.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResourceHints {
    pub cpu_millis: Option<u32>,
    pub memory_mb: Option<u32>,
    pub threads: Option<u32>,
}

/// Immutable descriptor of one executable unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub id: UnitId,
    pub version: String,
    pub description: Option<String>,
    pub required: bool,
    pub flavor: UnitFlavor,
    pub hard_deps: Vec<UnitId>,
    pub soft_deps: Vec<UnitId>,
    pub provides: Vec<String>,
    pub consumes: Vec<String>,
    pub config_keys: HashMap<String, ConfigKeyDef>,
    pub required_permissions: Vec<String>,
    pub declared_hooks: Vec<HookEvent>,
    pub hot_unload_allowed: bool,
    pub resources: ResourceHints,
    /// If true, the Lifecycle Engine's idempotence short-circuit is
    /// bypassed and the unit always re-executes.
    pub force_execute: bool,
}

impl Manifest {
    /// Registration-time validation: empty id is rejected by
    /// [`UnitId::parse`] before a `Manifest` can even be constructed from a
    /// document; here we check the remaining rules that need the full
    /// manifest: a `hard_deps` entry referring to the unit's own id, and
    /// that every declared hook is in the known set (already guaranteed by
    /// `declared_hooks: Vec<HookEvent>` being a typed enum — an untyped
    /// document parser is where an unknown hook name would be caught,
    /// see `aeon-manifest`).
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.hard_deps.iter().any(|d| *d == self.id) {
            return Err(CoreError::SelfDependency { id: self.id.clone() });
        }
        Ok(())
    }
}

crate::builder! {
    pub struct ManifestBuilder => Manifest {
        set { id: UnitId = UnitId::parse("test/unit").expect("valid") }
        into { version: String = "0.1.0" }
        option { description: String = None }
        set { required: bool = false }
        set { flavor: UnitFlavor = UnitFlavor::Task }
        set { hard_deps: Vec<UnitId> = Vec::new() }
        set { soft_deps: Vec<UnitId> = Vec::new() }
        set { provides: Vec<String> = Vec::new() }
        set { consumes: Vec<String> = Vec::new() }
        set { config_keys: HashMap<String, ConfigKeyDef> = HashMap::new() }
        set { required_permissions: Vec<String> = Vec::new() }
        set { declared_hooks: Vec<HookEvent> = Vec::new() }
        set { hot_unload_allowed: bool = true }
        set { resources: ResourceHints = ResourceHints::default() }
        set { force_execute: bool = false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_dependency_is_rejected() {
        let m = Manifest::builder()
            .id(UnitId::parse("g/n").unwrap())
            .hard_deps(vec![UnitId::parse("g/n").unwrap()])
            .build();
        assert!(matches!(m.validate(), Err(CoreError::SelfDependency { .. })));
    }

    #[test]
    fn valid_manifest_passes() {
        let m = Manifest::builder()
            .id(UnitId::parse("g/n").unwrap())
            .hard_deps(vec![UnitId::parse("g/other").unwrap()])
            .build();
        assert!(m.validate().is_ok());
    }

    #[test]
    fn config_key_defaults_round_trip_json() {
        let mut keys = HashMap::new();
        keys.insert(
            "retries".to_string(),
            ConfigKeyDef { declared_type: ConfigValueKind::Int, default: serde_json::json!(3) },
        );
        let m = Manifest::builder().id(UnitId::parse("g/n").unwrap()).config_keys(keys).build();
        let json = serde_json::to_string(&m.config_keys).unwrap();
        let back: HashMap<String, ConfigKeyDef> = serde_json::from_str(&json).unwrap();
        assert_eq!(back["retries"].default, serde_json::json!(3));
    }
}
