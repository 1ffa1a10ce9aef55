// SPDX-License-Identifier: MIT

use aeon_core::UnitId;
use thiserror::Error;
use std::time::Duration;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unit {unit} is missing required permission {permission}")]
    CapabilityDenied { unit: UnitId, permission: String },

    #[error("unit {unit} attempted illegal transition {from:?} -> {to:?}")]
    InvalidTransition { unit: UnitId, from: aeon_core::LifecycleState, to: aeon_core::LifecycleState },

    #[error("unit {unit} failed: {source}")]
    UnitFailed { unit: UnitId, #[source] source: aeon_core::UnitError },

    #[error("unit {unit} timed out after {elapsed:?}")]
    Timeout { unit: UnitId, elapsed: Duration },

    #[error("state store error: {0}")]
    Store(#[from] aeon_store::StoreError),
}
