// SPDX-License-Identifier: MIT

//! On-disk system/user config documents, re-expressed as TOML (the
//! workspace's document format) in place of the source's YAML files —
//! same `group.name.key` nesting, same semantics.

use crate::error::ConfigError;
use crate::value::ConfigValue;
use aeon_core::UnitId;
use std::collections::HashMap;
use std::path::Path;

/// Parse a config document shaped as `[group.name] key = value`, returning
/// one value map per unit id.
pub fn parse_document(text: &str) -> Result<HashMap<UnitId, HashMap<String, ConfigValue>>, ConfigError> {
    parse_document_at(text, "<in-memory>")
}

fn parse_document_at(text: &str, path: &str) -> Result<HashMap<UnitId, HashMap<String, ConfigValue>>, ConfigError> {
    let raw: toml::Table = toml::from_str(text)
        .map_err(|source| ConfigError::DocumentParse { path: path.to_string(), source })?;

    let mut out = HashMap::new();
    for (group, group_value) in &raw {
        let Some(group_table) = group_value.as_table() else { continue };
        for (name, unit_value) in group_table {
            let Some(unit_table) = unit_value.as_table() else { continue };
            let id = match UnitId::parse(&format!("{group}/{name}")) {
                Ok(id) => id,
                Err(_) => continue,
            };
            let mut values = HashMap::new();
            for (key, v) in unit_table {
                if let Some(cv) = toml_to_config_value(v) {
                    values.insert(key.clone(), cv);
                }
            }
            out.insert(id, values);
        }
    }
    Ok(out)
}

pub fn load_file(path: &Path) -> Result<HashMap<UnitId, HashMap<String, ConfigValue>>, ConfigError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
    parse_document_at(&text, &path.display().to_string())
}

fn toml_to_config_value(v: &toml::Value) -> Option<ConfigValue> {
    match v {
        toml::Value::Boolean(b) => Some(ConfigValue::Bool(*b)),
        toml::Value::Integer(i) => Some(ConfigValue::Int(*i)),
        toml::Value::Float(f) => Some(ConfigValue::Float(*f)),
        toml::Value::String(s) => Some(ConfigValue::Str(s.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_group_name_key_table() {
        let doc = r#"
            [net.ip-config]
            retries = 3
            strict = true
            label = "eth0"
        "#;
        let parsed = parse_document(doc).unwrap();
        let values = &parsed[&UnitId::parse("net/ip-config").unwrap()];
        assert_eq!(values["retries"], ConfigValue::Int(3));
        assert_eq!(values["strict"], ConfigValue::Bool(true));
        assert_eq!(values["label"], ConfigValue::Str("eth0".to_string()));
    }

    #[test]
    fn missing_file_returns_empty_map() {
        let parsed = load_file(Path::new("/nonexistent/path/does/not/exist.toml")).unwrap();
        assert!(parsed.is_empty());
    }
}
