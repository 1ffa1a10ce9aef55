// SPDX-License-Identifier: MIT

use aeon_core::UnitId;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DepGraphError {
    #[error("{unit} depends on unknown unit {missing}")]
    MissingDependency { unit: UnitId, missing: UnitId },

    #[error("circular dependency detected: {}", format_path(.path))]
    CycleDetected { path: Vec<UnitId> },

    #[error("{unit} is registered with conflicting versions {existing} and {incoming}")]
    VersionConflict { unit: UnitId, existing: String, incoming: String },
}

fn format_path(path: &[UnitId]) -> String {
    path.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(" -> ")
}
