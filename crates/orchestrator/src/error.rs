// SPDX-License-Identifier: MIT

use aeon_core::UnitId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Registry(#[from] aeon_core::CoreError),

    #[error(transparent)]
    DepGraph(#[from] aeon_depgraph::DepGraphError),

    #[error(transparent)]
    Store(#[from] aeon_store::StoreError),

    #[error(transparent)]
    Manifest(#[from] aeon_manifest::ManifestError),

    #[error("unknown unit {id}")]
    UnknownUnit { id: UnitId },

    #[error("unit {id} does not allow hot unload/reload")]
    HotUnloadDisallowed { id: UnitId },

    #[error("no dependency plan has been resolved yet; call discover()/resolve_plan() first")]
    PlanNotResolved,
}
