// SPDX-License-Identifier: MIT

use aeon_core::LifecycleState;

/// Result of driving one unit through a single transition.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleOutcome {
    pub state: LifecycleState,
    pub payload: Option<serde_json::Value>,
    /// True when the idempotence short-circuit fired: the stored result
    /// was returned without re-running the unit's body or any hook
    /// beyond `on_load`.
    pub short_circuited: bool,
}

impl LifecycleOutcome {
    pub fn fresh(state: LifecycleState, payload: Option<serde_json::Value>) -> Self {
        Self { state, payload, short_circuited: false }
    }

    pub fn cached(state: LifecycleState, payload: Option<serde_json::Value>) -> Self {
        Self { state, payload, short_circuited: true }
    }
}
