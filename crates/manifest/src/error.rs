// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{path}: not valid JSON: {source}")]
    Parse { path: String, source: serde_json::Error },

    #[error("{path}: could not be read: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("{path}: unrecognized schema {schema:?}, expected {expected:?}")]
    UnknownSchema { path: String, schema: String, expected: String },

    #[error("{path}: unsupported manifest version {version:?}, expected \"1.0\"")]
    UnsupportedVersion { path: String, version: String },

    #[error("{path}: declares unknown hook {hook:?}")]
    UnknownHook { path: String, hook: String },

    #[error("{path}: {source}")]
    InvalidUnit { path: String, #[source] source: aeon_core::CoreError },

    #[error("path {0:?} escapes its manifest root")]
    PathTraversal(String),

    #[error("{path}: duplicate step id {id:?} in flow {flow:?}")]
    DuplicateStepId { path: String, flow: String, id: String },

    #[error("{path}: references task {task:?}, which is not listed in tasks[]")]
    UnknownTask { path: String, task: String },

    #[error("{path}: unsupported step method {method:?} (expected one of load/start/stop/unload/resolve)")]
    UnsupportedMethod { path: String, method: String },

    #[error("{path}: required file missing: {file}")]
    RequiredFileMissing { path: String, file: String },
}
