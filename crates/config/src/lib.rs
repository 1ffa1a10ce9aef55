// SPDX-License-Identifier: MIT

//! aeon-config: the layered configuration resolver (C3).
//!
//! Five precedence layers, a secret-provider abstraction, hot-reload
//! callbacks, and a bounded audit trail — grounded in
//! `original_source/runtime/python/nexus/core/config.py`'s
//! `ConfigurationManager`.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod audit;
mod error;
mod loader;
mod resolver;
mod secrets;
mod value;

pub use audit::{AuditAction, AuditEntry, AuditLog, AUDIT_LOG_CAPACITY};
pub use error::ConfigError;
pub use loader::{load_file as load_config_file, parse_document};
pub use resolver::ConfigResolver;
pub use secrets::{EnvSecretProvider, FileSecretProvider, SecretProvider};
pub use value::ConfigValue;
