// SPDX-License-Identifier: MIT

//! Error kinds raised while building and validating manifests and ids.

use crate::id::UnitId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid unit id {id:?}: {reason}")]
    InvalidUnitId { id: String, reason: String },

    #[error("manifest {id} references itself in hard_deps")]
    SelfDependency { id: UnitId },

    #[error("manifest {id} declares unknown hook {hook:?}")]
    UnknownHook { id: UnitId, hook: String },

    #[error("manifest id is empty")]
    EmptyId,

    #[error("duplicate registration of {id} with a different manifest")]
    DuplicateId { id: UnitId },
}
