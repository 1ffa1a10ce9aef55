// SPDX-License-Identifier: MIT

//! The resolved config value type and its coercions.

use crate::error::ConfigError;
use aeon_core::ConfigValueKind;

/// A fully-resolved configuration value, typed exhaustively rather than
/// left as `serde_json::Value`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConfigValue {
    pub fn kind(&self) -> ConfigValueKind {
        match self {
            ConfigValue::Bool(_) => ConfigValueKind::Bool,
            ConfigValue::Int(_) => ConfigValueKind::Int,
            ConfigValue::Float(_) => ConfigValueKind::Float,
            ConfigValue::Str(_) => ConfigValueKind::String,
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(ConfigValue::Bool(*b)),
            serde_json::Value::String(s) => Some(ConfigValue::Str(s.clone())),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ConfigValue::Int(i))
                } else {
                    n.as_f64().map(ConfigValue::Float)
                }
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ConfigValue::Bool(b) => serde_json::json!(b),
            ConfigValue::Int(i) => serde_json::json!(i),
            ConfigValue::Float(f) => serde_json::json!(f),
            ConfigValue::Str(s) => serde_json::json!(s),
        }
    }

    /// Coerce this value to the declared kind, mirroring the source's
    /// `_parse_env_value` boolean string-set handling
    /// (`{true,1,yes,on}` / `{false,0,no,off}`, case-insensitive) and
    /// numeric string parsing.
    pub fn coerce(&self, kind: ConfigValueKind) -> Result<ConfigValue, ConfigError> {
        if self.kind() == kind {
            return Ok(self.clone());
        }
        let as_string = match self {
            ConfigValue::Str(s) => s.clone(),
            ConfigValue::Bool(b) => b.to_string(),
            ConfigValue::Int(i) => i.to_string(),
            ConfigValue::Float(f) => f.to_string(),
        };
        match kind {
            ConfigValueKind::Bool => match as_string.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(ConfigValue::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(ConfigValue::Bool(false)),
                _ => Err(ConfigError::TypeMismatch { expected: kind, found: self.kind() }),
            },
            ConfigValueKind::Int => as_string
                .parse::<i64>()
                .map(ConfigValue::Int)
                .map_err(|_| ConfigError::TypeMismatch { expected: kind, found: self.kind() }),
            ConfigValueKind::Float => as_string
                .parse::<f64>()
                .map(ConfigValue::Float)
                .map_err(|_| ConfigError::TypeMismatch { expected: kind, found: self.kind() }),
            ConfigValueKind::String => Ok(ConfigValue::Str(as_string)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_coercion_accepts_the_source_string_set() {
        for truthy in ["true", "1", "yes", "on", "TRUE", "On"] {
            assert_eq!(ConfigValue::Str(truthy.to_string()).coerce(ConfigValueKind::Bool).unwrap(), ConfigValue::Bool(true));
        }
        for falsy in ["false", "0", "no", "off"] {
            assert_eq!(ConfigValue::Str(falsy.to_string()).coerce(ConfigValueKind::Bool).unwrap(), ConfigValue::Bool(false));
        }
    }

    #[test]
    fn int_coercion_from_string() {
        assert_eq!(ConfigValue::Str("42".to_string()).coerce(ConfigValueKind::Int).unwrap(), ConfigValue::Int(42));
    }

    #[test]
    fn invalid_bool_string_errors() {
        assert!(ConfigValue::Str("maybe".to_string()).coerce(ConfigValueKind::Bool).is_err());
    }

    #[test]
    fn already_matching_kind_is_a_no_op() {
        assert_eq!(ConfigValue::Int(7).coerce(ConfigValueKind::Int).unwrap(), ConfigValue::Int(7));
    }
}
