// SPDX-License-Identifier: MIT

//! The layered config resolver (C3), grounded in
//! `original_source/.../config.py::ConfigurationManager`.

use crate::audit::{AuditAction, AuditEntry, AuditLog};
use crate::error::ConfigError;
use crate::secrets::{EnvSecretProvider, SecretProvider};
use crate::value::ConfigValue;
use aeon_core::{Clock, ConfigValueKind, SystemClock, UnitId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

type ReloadCallback = Arc<dyn Fn(&str, &ConfigValue) + Send + Sync>;

/// The five precedence layers, highest priority first:
/// runtime overrides, process env (`NEXUS_<GROUP>_<NAME>_<KEY>`), user
/// config, unit defaults, system config.
pub struct ConfigResolver {
    system_config: RwLock<HashMap<UnitId, HashMap<String, ConfigValue>>>,
    user_config: RwLock<HashMap<UnitId, HashMap<String, ConfigValue>>>,
    unit_defaults: RwLock<HashMap<UnitId, HashMap<String, ConfigValue>>>,
    runtime_overrides: RwLock<HashMap<UnitId, HashMap<String, ConfigValue>>>,
    secret_provider: Arc<dyn SecretProvider>,
    reload_callbacks: RwLock<HashMap<UnitId, Vec<ReloadCallback>>>,
    audit_log: Mutex<AuditLog>,
    clock: Arc<dyn Clock>,
}

const ENV_PREFIX: &str = "NEXUS_";

impl ConfigResolver {
    pub fn new() -> Self {
        Self::with_secret_provider(Arc::new(EnvSecretProvider))
    }

    pub fn with_secret_provider(secret_provider: Arc<dyn SecretProvider>) -> Self {
        Self {
            system_config: RwLock::new(HashMap::new()),
            user_config: RwLock::new(HashMap::new()),
            unit_defaults: RwLock::new(HashMap::new()),
            runtime_overrides: RwLock::new(HashMap::new()),
            secret_provider,
            reload_callbacks: RwLock::new(HashMap::new()),
            audit_log: Mutex::new(AuditLog::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn load_system_config(&self, unit: UnitId, values: HashMap<String, ConfigValue>) {
        self.system_config.write().insert(unit.clone(), values);
        self.audit(AuditAction::LoadSystemConfig, unit, String::new(), None, None);
    }

    pub fn load_user_config(&self, unit: UnitId, values: HashMap<String, ConfigValue>) {
        self.user_config.write().insert(unit.clone(), values);
        self.audit(AuditAction::LoadUserConfig, unit, String::new(), None, None);
    }

    /// Remove a unit's whole user-config layer, falling back to whatever
    /// the next layer down supplies.
    pub fn clear_user_config(&self, unit: &UnitId) {
        self.user_config.write().remove(unit);
    }

    /// Remove a unit's whole system-config layer.
    pub fn clear_system_config(&self, unit: &UnitId) {
        self.system_config.write().remove(unit);
    }

    /// Load a whole system-config document (`[group.name] key = value`
    /// tables) from disk, replacing any per-unit entries it names.
    pub fn load_system_config_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        for (unit, values) in crate::loader::load_file(path)? {
            self.load_system_config(unit, values);
        }
        Ok(())
    }

    pub fn load_user_config_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        for (unit, values) in crate::loader::load_file(path)? {
            self.load_user_config(unit, values);
        }
        Ok(())
    }

    pub fn register_unit_defaults(&self, unit: UnitId, values: HashMap<String, ConfigValue>) {
        self.unit_defaults.write().insert(unit, values);
    }

    pub fn set_runtime_override(&self, unit: UnitId, key: impl Into<String>, value: ConfigValue) {
        let key = key.into();
        let old = self.runtime_overrides.read().get(&unit).and_then(|m| m.get(&key)).cloned();
        self.runtime_overrides
            .write()
            .entry(unit.clone())
            .or_default()
            .insert(key.clone(), value.clone());
        self.audit(
            AuditAction::SetRuntimeOverride,
            unit.clone(),
            key.clone(),
            old.map(|v| v.to_json().to_string()),
            Some(value.to_json().to_string()),
        );
        self.trigger_reload_callbacks(&unit, &key, &value);
    }

    /// Remove a single key's runtime override, exposing whatever the next
    /// layer down (process env, user config, unit default, system config)
    /// supplies on the next `get`. A no-op if no override was set.
    pub fn clear_override(&self, unit: &UnitId, key: &str) {
        let old = self.runtime_overrides.write().get_mut(unit).and_then(|m| m.remove(key));
        if let Some(old) = old {
            self.audit(
                AuditAction::ClearRuntimeOverride,
                unit.clone(),
                key.to_string(),
                Some(old.to_json().to_string()),
                None,
            );
        }
    }

    pub fn register_reload_callback(&self, unit: UnitId, callback: ReloadCallback) {
        self.reload_callbacks.write().entry(unit).or_default().push(callback);
    }

    fn trigger_reload_callbacks(&self, unit: &UnitId, key: &str, value: &ConfigValue) {
        if let Some(callbacks) = self.reload_callbacks.read().get(unit) {
            for cb in callbacks {
                cb(key, value);
            }
        }
    }

    /// Resolve `unit.key` through the five layers, falling back to
    /// `default` and coercing to `kind` only if the value didn't already
    /// come back at the right kind.
    pub fn get(
        &self,
        unit: &UnitId,
        key: &str,
        kind: ConfigValueKind,
        default: Option<ConfigValue>,
    ) -> Result<ConfigValue, ConfigError> {
        let (value, _source) = self.resolve_layered(unit, key).or_else(|| default.clone().map(|v| (v, Source::Default)))
            .ok_or_else(|| ConfigError::MissingKey { unit: unit.clone(), key: key.to_string() })?;
        value.coerce(kind)
    }

    fn resolve_layered(&self, unit: &UnitId, key: &str) -> Option<(ConfigValue, Source)> {
        if let Some(v) = self.runtime_overrides.read().get(unit).and_then(|m| m.get(key)) {
            return Some((v.clone(), Source::Runtime));
        }
        if let Some(v) = env_lookup(unit, key) {
            return Some((v, Source::Environment));
        }
        if let Some(v) = self.user_config.read().get(unit).and_then(|m| m.get(key)) {
            return Some((v.clone(), Source::User));
        }
        if let Some(v) = self.unit_defaults.read().get(unit).and_then(|m| m.get(key)) {
            return Some((v.clone(), Source::UnitDefault));
        }
        if let Some(v) = self.system_config.read().get(unit).and_then(|m| m.get(key)) {
            return Some((v.clone(), Source::System));
        }
        None
    }

    pub fn get_secret(&self, unit: &UnitId, key: &str) -> Result<String, ConfigError> {
        let path = format!("aeon/{unit}/{key}");
        self.secret_provider.get_secret(&path)
    }

    pub fn set_secret(&self, unit: &UnitId, key: &str, value: &str) -> Result<(), ConfigError> {
        let path = format!("aeon/{unit}/{key}");
        self.secret_provider.set_secret(&path, value)?;
        self.audit(AuditAction::SetSecret, unit.clone(), key.to_string(), None, None);
        Ok(())
    }

    /// The fully-merged effective config for a unit, each key taken from
    /// its highest-precedence layer.
    pub fn section(&self, unit: &UnitId) -> HashMap<String, ConfigValue> {
        let mut merged = HashMap::new();
        for layer in [
            self.system_config.read().get(unit),
            self.unit_defaults.read().get(unit),
            self.user_config.read().get(unit),
        ]
        .into_iter()
        .flatten()
        {
            merged.extend(layer.clone());
        }
        merged.extend(env_section(unit));
        if let Some(overrides) = self.runtime_overrides.read().get(unit) {
            merged.extend(overrides.clone());
        }
        merged
    }

    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.audit_log.lock().entries().cloned().collect()
    }

    fn audit(&self, action: AuditAction, unit: UnitId, key: String, old: Option<String>, new: Option<String>) {
        let timestamp_ms = self.clock.epoch_ms() as i64;
        self.audit_log.lock().push(AuditEntry { timestamp_ms, action, unit, key, old, new });
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Runtime,
    Environment,
    User,
    UnitDefault,
    System,
    Default,
}

fn env_var_name(unit: &UnitId, key: &str) -> String {
    format!(
        "{ENV_PREFIX}{}_{}_{}",
        unit.group().to_ascii_uppercase(),
        unit.name().to_ascii_uppercase().replace('-', "_"),
        key.to_ascii_uppercase()
    )
}

fn env_lookup(unit: &UnitId, key: &str) -> Option<ConfigValue> {
    std::env::var(env_var_name(unit, key)).ok().map(ConfigValue::Str)
}

fn env_section(unit: &UnitId) -> HashMap<String, ConfigValue> {
    let prefix = format!(
        "{ENV_PREFIX}{}_{}_",
        unit.group().to_ascii_uppercase(),
        unit.name().to_ascii_uppercase().replace('-', "_")
    );
    std::env::vars()
        .filter_map(|(k, v)| {
            k.strip_prefix(&prefix).map(|rest| (rest.to_ascii_lowercase(), ConfigValue::Str(v)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn unit() -> UnitId {
        UnitId::parse("net/ip-config").unwrap()
    }

    #[test]
    fn unit_default_is_used_when_no_override_present() {
        let resolver = ConfigResolver::new();
        let mut defaults = HashMap::new();
        defaults.insert("retries".to_string(), ConfigValue::Int(3));
        resolver.register_unit_defaults(unit(), defaults);

        let v = resolver.get(&unit(), "retries", ConfigValueKind::Int, None).unwrap();
        assert_eq!(v, ConfigValue::Int(3));
    }

    #[test]
    fn runtime_override_wins_over_unit_default() {
        let resolver = ConfigResolver::new();
        let mut defaults = HashMap::new();
        defaults.insert("retries".to_string(), ConfigValue::Int(3));
        resolver.register_unit_defaults(unit(), defaults);
        resolver.set_runtime_override(unit(), "retries", ConfigValue::Int(9));

        let v = resolver.get(&unit(), "retries", ConfigValueKind::Int, None).unwrap();
        assert_eq!(v, ConfigValue::Int(9));
    }

    #[test]
    #[serial(env_config)]
    fn process_env_wins_over_user_and_system_config() {
        let resolver = ConfigResolver::new();
        let mut system = HashMap::new();
        system.insert("timeout_s".to_string(), ConfigValue::Int(30));
        resolver.load_system_config(unit(), system);

        let var_name = env_var_name(&unit(), "timeout_s");
        std::env::set_var(&var_name, "99");
        let v = resolver.get(&unit(), "timeout_s", ConfigValueKind::Int, None).unwrap();
        std::env::remove_var(&var_name);
        assert_eq!(v, ConfigValue::Int(99));
    }

    #[test]
    fn missing_key_without_default_errors() {
        let resolver = ConfigResolver::new();
        let err = resolver.get(&unit(), "nope", ConfigValueKind::String, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { .. }));
    }

    #[test]
    fn default_is_used_as_last_resort() {
        let resolver = ConfigResolver::new();
        let v = resolver
            .get(&unit(), "nope", ConfigValueKind::Bool, Some(ConfigValue::Bool(true)))
            .unwrap();
        assert_eq!(v, ConfigValue::Bool(true));
    }

    #[test]
    fn reload_callback_fires_on_runtime_override() {
        let resolver = ConfigResolver::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        resolver.register_reload_callback(
            unit(),
            Arc::new(move |key, value| {
                *seen_clone.lock() = Some((key.to_string(), value.clone()));
            }),
        );
        resolver.set_runtime_override(unit(), "retries", ConfigValue::Int(5));
        let seen = seen.lock();
        assert_eq!(seen.as_ref().unwrap().0, "retries");
    }

    #[test]
    fn audit_log_records_mutations() {
        let resolver = ConfigResolver::new();
        resolver.set_runtime_override(unit(), "retries", ConfigValue::Int(5));
        let log = resolver.audit_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, AuditAction::SetRuntimeOverride);
        assert_eq!(log[0].new.as_deref(), Some("5"));
    }

    #[test]
    #[serial(env_config)]
    fn clear_override_falls_back_through_the_remaining_layers() {
        let resolver = ConfigResolver::new();
        let mut system = HashMap::new();
        system.insert("k".to_string(), ConfigValue::Int(1));
        resolver.load_system_config(unit(), system);

        let mut user = HashMap::new();
        user.insert("k".to_string(), ConfigValue::Int(2));
        resolver.load_user_config(unit(), user);

        let var_name = env_var_name(&unit(), "k");
        std::env::set_var(&var_name, "3");
        resolver.set_runtime_override(unit(), "k", ConfigValue::Int(4));

        assert_eq!(resolver.get(&unit(), "k", ConfigValueKind::Int, None).unwrap(), ConfigValue::Int(4));

        resolver.clear_override(&unit(), "k");
        assert_eq!(resolver.get(&unit(), "k", ConfigValueKind::Int, None).unwrap(), ConfigValue::Int(3));

        std::env::remove_var(&var_name);
        assert_eq!(resolver.get(&unit(), "k", ConfigValueKind::Int, None).unwrap(), ConfigValue::Int(2));

        resolver.clear_user_config(&unit());
        assert_eq!(resolver.get(&unit(), "k", ConfigValueKind::Int, None).unwrap(), ConfigValue::Int(1));
    }

    #[test]
    fn clearing_an_unset_override_is_a_no_op() {
        let resolver = ConfigResolver::new();
        resolver.clear_override(&unit(), "nope");
        assert!(resolver.audit_log().is_empty());
    }

    #[test]
    fn audit_entries_carry_the_injected_clock_timestamp() {
        let clock = Arc::new(aeon_core::FakeClock::new());
        clock.set_epoch_ms(42_000);
        let resolver = ConfigResolver::new().with_clock(clock);
        resolver.set_runtime_override(unit(), "retries", ConfigValue::Int(5));
        assert_eq!(resolver.audit_log()[0].timestamp_ms, 42_000);
    }
}
