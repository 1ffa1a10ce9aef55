// SPDX-License-Identifier: MIT

//! aeon-core: shared types for the Aeon orchestration kernel.
//!
//! This crate owns the data model every other crate reads: unit identity,
//! the manifest descriptor, the lifecycle state machine, hook typing, and
//! the handful of small abstractions (clock, ids, metrics) the rest of the
//! workspace builds on.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod macros;

pub mod background;
pub mod clock;
pub mod error;
pub mod hooks;
pub mod id;
pub mod manifest;
pub mod metrics;
pub mod registry;
pub mod security;
pub mod unit;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use background::BackgroundHandle;
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::CoreError;
pub use hooks::{HookContext, HookEvent, HookFn, HookFuture, HookOutcome, HookSet};
pub use id::UnitId;
pub use manifest::{ConfigKeyDef, ConfigValueKind, Manifest, ManifestBuilder, ResourceHints, UnitFlavor};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use registry::{ManifestRegistry, RegisteredUnit};
pub use security::SecurityContext;
pub use unit::{HealthStatus, ServiceUnit, TaskUnit, UnitBody, UnitError};

/// Lifecycle states a unit may occupy.
///
/// Service-flavored units use the `{UNLOADED, LOADED, STARTED, STOPPED,
/// FAILED}` subset; task-flavored units additionally use `{PENDING,
/// RESOLVED, REJECTED, INCOMPLETE, BLOCKED}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Unloaded,
    Loaded,
    Started,
    Stopped,
    Failed,
    Pending,
    Resolved,
    Rejected,
    Incomplete,
    Blocked,
}

crate::simple_display! {
    LifecycleState {
        Unloaded => "unloaded",
        Loaded => "loaded",
        Started => "started",
        Stopped => "stopped",
        Failed => "failed",
        Pending => "pending",
        Resolved => "resolved",
        Rejected => "rejected",
        Incomplete => "incomplete",
        Blocked => "blocked",
    }
}

impl LifecycleState {
    /// Legal targets from this state, per the lifecycle state machine.
    /// `FAILED` may be reached from `{Loaded, Started,
    /// Stopped}` at any point; the only exit from `FAILED` is `unload`.
    pub fn can_transition_to(self, target: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, target) {
            (Unloaded, Loaded) => true,
            (Loaded, Started) => true,
            (Started, Stopped) => true,
            (Stopped, Unloaded) => true,
            (Loaded | Started | Stopped, Failed) => true,
            (Failed, Unloaded) => true,
            // Task flavor's short-lived analogue of load/start/stop/unload.
            (Unloaded, Pending) => true,
            (Pending, Resolved) => true,
            (Pending, Rejected) => true,
            (Pending, Incomplete) => true,
            (Pending, Blocked) => true,
            (Pending | Resolved | Rejected | Incomplete | Blocked, Failed) => true,
            (Resolved | Rejected | Incomplete | Blocked, Unloaded) => true,
            _ => false,
        }
    }

    pub fn is_terminal_failure(self) -> bool {
        matches!(self, LifecycleState::Failed)
    }
}
