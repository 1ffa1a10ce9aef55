// SPDX-License-Identifier: MIT

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, so `main()` is the single place that terminates the process.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    pub fn dependency(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn user_abort(message: impl Into<String>) -> Self {
        Self::new(5, message)
    }

    pub fn sigint() -> Self {
        Self::new(130, "interrupted")
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(1, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<aeon_orchestrator::OrchestratorError> for ExitError {
    fn from(err: aeon_orchestrator::OrchestratorError) -> Self {
        use aeon_orchestrator::OrchestratorError::*;
        match err {
            DepGraph(source) => ExitError::dependency(source.to_string()),
            Manifest(source) => ExitError::validation(source.to_string()),
            Registry(source) => ExitError::validation(source.to_string()),
            UnknownUnit { .. } | HotUnloadDisallowed { .. } | PlanNotResolved => {
                ExitError::usage(err.to_string())
            }
            Store(source) => ExitError::runtime(source.to_string()),
        }
    }
}
