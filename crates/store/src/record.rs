// SPDX-License-Identifier: MIT

//! The per-unit persisted record.

use aeon_core::LifecycleState;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UnitRecord {
    pub state: LifecycleState,
    /// Present only for units that have reached `RESOLVED`/`STARTED` at
    /// least once.
    pub result: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl UnitRecord {
    pub fn new(state: LifecycleState, updated_at: DateTime<Utc>) -> Self {
        Self { state, result: None, updated_at }
    }
}
