// SPDX-License-Identifier: MIT

//! The on-disk manifest document: the JSON shape a unit author writes,
//! distinct from the in-memory [`aeon_core::Manifest`] the registry holds
//! and from the process-level [`crate::instruction::InstructionDocument`]
//! (schema `"aeon.instructions"`) an entry point loads.
//!
//! Schema tag and version are checked before any field is trusted;
//! everything past that point reuses `aeon-core`'s own validation.

use crate::error::ManifestError;
use aeon_core::{ConfigKeyDef, HookEvent, Manifest, ResourceHints, UnitFlavor, UnitId};
use std::collections::HashMap;

const SCHEMA_TAG: &str = "aeon.unit";
const SUPPORTED_VERSION: &str = "1.0";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ManifestDocument {
    pub schema: String,
    pub version: String,
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_flavor")]
    pub flavor: UnitFlavor,
    #[serde(default)]
    pub hard_deps: Vec<String>,
    #[serde(default)]
    pub soft_deps: Vec<String>,
    #[serde(default)]
    pub provides: Vec<String>,
    #[serde(default)]
    pub consumes: Vec<String>,
    #[serde(default)]
    pub config_keys: HashMap<String, ConfigKeyDef>,
    #[serde(default)]
    pub required_permissions: Vec<String>,
    #[serde(default)]
    pub hooks: Vec<String>,
    #[serde(default = "default_true")]
    pub hot_unload_allowed: bool,
    #[serde(default)]
    pub resources: ResourceHints,
    #[serde(default)]
    pub force_execute: bool,
}

fn default_flavor() -> UnitFlavor {
    UnitFlavor::Task
}

fn default_true() -> bool {
    true
}

/// Parse a manifest document's JSON text, identified by `path` for error
/// reporting, and turn it into a validated [`Manifest`].
pub fn parse_document(text: &str, path: &str) -> Result<Manifest, ManifestError> {
    let doc: ManifestDocument =
        serde_json::from_str(text).map_err(|source| ManifestError::Parse { path: path.to_string(), source })?;
    document_to_manifest(doc, path)
}

fn document_to_manifest(doc: ManifestDocument, path: &str) -> Result<Manifest, ManifestError> {
    if doc.schema != SCHEMA_TAG {
        return Err(ManifestError::UnknownSchema {
            path: path.to_string(),
            schema: doc.schema,
            expected: SCHEMA_TAG.to_string(),
        });
    }
    if doc.version != SUPPORTED_VERSION {
        return Err(ManifestError::UnsupportedVersion { path: path.to_string(), version: doc.version });
    }

    let id = UnitId::parse(doc.id).map_err(|source| ManifestError::InvalidUnit { path: path.to_string(), source })?;

    let hard_deps = parse_ids(doc.hard_deps, path)?;
    let soft_deps = parse_ids(doc.soft_deps, path)?;

    let mut declared_hooks = Vec::with_capacity(doc.hooks.len());
    for name in doc.hooks {
        match HookEvent::parse(&name) {
            Some(event) => declared_hooks.push(event),
            None => return Err(ManifestError::UnknownHook { path: path.to_string(), hook: name }),
        }
    }

    let manifest = Manifest {
        id,
        version: doc.version,
        description: doc.description,
        required: doc.required,
        flavor: doc.flavor,
        hard_deps,
        soft_deps,
        provides: doc.provides,
        consumes: doc.consumes,
        config_keys: doc.config_keys,
        required_permissions: doc.required_permissions,
        declared_hooks,
        hot_unload_allowed: doc.hot_unload_allowed,
        resources: doc.resources,
        force_execute: doc.force_execute,
    };

    manifest
        .validate()
        .map_err(|source| ManifestError::InvalidUnit { path: path.to_string(), source })?;

    Ok(manifest)
}

fn parse_ids(raw: Vec<String>, path: &str) -> Result<Vec<UnitId>, ManifestError> {
    raw.into_iter()
        .map(|s| UnitId::parse(s).map_err(|source| ManifestError::InvalidUnit { path: path.to_string(), source }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(extra: &str) -> String {
        format!(
            r#"{{"schema":"aeon.unit","version":"1.0","id":"g/n"{}}}"#,
            extra
        )
    }

    #[test]
    fn minimal_document_parses() {
        let manifest = parse_document(&sample(""), "g/n.json").unwrap();
        assert_eq!(manifest.id.as_str(), "g/n");
        assert_eq!(manifest.flavor, UnitFlavor::Task);
        assert!(manifest.hot_unload_allowed);
    }

    #[test]
    fn wrong_schema_is_rejected() {
        let text = r#"{"schema":"other","version":"1.0","id":"g/n"}"#;
        let err = parse_document(text, "g/n.json").unwrap_err();
        assert!(matches!(err, ManifestError::UnknownSchema { .. }));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let text = r#"{"schema":"aeon.unit","version":"2.0","id":"g/n"}"#;
        let err = parse_document(text, "g/n.json").unwrap_err();
        assert!(matches!(err, ManifestError::UnsupportedVersion { .. }));
    }

    #[test]
    fn unknown_hook_name_is_rejected() {
        let text = sample(r#","hooks":["on_teardown"]"#);
        let err = parse_document(&text, "g/n.json").unwrap_err();
        assert!(matches!(err, ManifestError::UnknownHook { .. }));
    }

    #[test]
    fn hard_deps_and_hooks_parse() {
        let text = sample(r#","hard_deps":["g/other"],"hooks":["on_load","on_error"]"#);
        let manifest = parse_document(&text, "g/n.json").unwrap();
        assert_eq!(manifest.hard_deps, vec![UnitId::parse("g/other").unwrap()]);
        assert_eq!(manifest.declared_hooks, vec![HookEvent::OnLoad, HookEvent::OnError]);
    }

    #[test]
    fn self_referencing_hard_dep_fails_validation() {
        let text = sample(r#","hard_deps":["g/n"]"#);
        let err = parse_document(&text, "g/n.json").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidUnit { .. }));
    }
}
