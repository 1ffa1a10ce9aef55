// SPDX-License-Identifier: MIT

use aeon_core::{ConfigValueKind, UnitId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config key '{key}' not found for unit '{unit}' and no default provided")]
    MissingKey { unit: UnitId, key: String },

    #[error("config value for '{unit}.{key}' expected {expected:?}, found {found:?}")]
    TypeMismatch { expected: ConfigValueKind, found: ConfigValueKind },

    #[error("secret not found: {path}")]
    SecretNotFound { path: String },

    #[error("failed to read secret file {path}: {source}")]
    SecretIo { path: String, #[source] source: std::io::Error },

    #[error("failed to parse config document at {path}: {source}")]
    DocumentParse { path: String, #[source] source: toml::de::Error },

    #[error("failed to read config file at {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
}
