// SPDX-License-Identifier: MIT

//! Hook event typing and dispatch context.
//!
//! A unit's manifest *declares* which of the known hook events it wires up
//! (for validation), and separately a [`HookSet`] carries the actual
//! function values — a fixed set of optional function-typed fields, one
//! per event. A missing field is the zero value and means "skip".

use crate::clock::Clock;
use crate::id::UnitId;
use crate::unit::UnitError;
use crate::LifecycleState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The hook events the Lifecycle Engine dispatches, in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    OnLoad,
    BeforeResolve,
    BeforeStart,
    OnResolve,
    OnStart,
    OnSuccess,
    OnError,
    AfterResolve,
    AfterStop,
}

crate::simple_display! {
    HookEvent {
        OnLoad => "on_load",
        BeforeResolve => "before_resolve",
        BeforeStart => "before_start",
        OnResolve => "on_resolve",
        OnStart => "on_start",
        OnSuccess => "on_success",
        OnError => "on_error",
        AfterResolve => "after_resolve",
        AfterStop => "after_stop",
    }
}

impl HookEvent {
    pub const ALL: [HookEvent; 9] = [
        HookEvent::OnLoad,
        HookEvent::BeforeResolve,
        HookEvent::BeforeStart,
        HookEvent::OnResolve,
        HookEvent::OnStart,
        HookEvent::OnSuccess,
        HookEvent::OnError,
        HookEvent::AfterResolve,
        HookEvent::AfterStop,
    ];

    /// Parse a manifest-declared hook name. `None` for a name not in the
    /// known set, which registration rejects as a validation failure.
    pub fn parse(name: &str) -> Option<HookEvent> {
        Self::ALL.into_iter().find(|e| e.to_string() == name)
    }
}

/// Boxed future returned by a hook invocation.
pub type HookFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, UnitError>> + Send>>;

/// A hook function: takes the dispatch context and the current event
/// payload, and may return a replacement payload forwarded to later hooks.
pub type HookFn = Arc<dyn Fn(&mut HookContext, serde_json::Value) -> HookFuture + Send + Sync>;

/// The function-typed fields a unit may wire up, one per [`HookEvent`].
/// Missing = `None` = skip.
#[derive(Clone, Default)]
pub struct HookSet {
    slots: HashMap<HookEvent, HookFn>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, event: HookEvent, f: HookFn) -> Self {
        self.slots.insert(event, f);
        self
    }

    pub fn get(&self, event: HookEvent) -> Option<&HookFn> {
        self.slots.get(&event)
    }

    pub fn declared_events(&self) -> Vec<HookEvent> {
        let mut events: Vec<HookEvent> = self.slots.keys().copied().collect();
        events.sort_by_key(|e| e.to_string());
        events
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("declared", &self.declared_events())
            .finish()
    }
}

/// Outcome of dispatching a single hook.
#[derive(Debug)]
pub enum HookOutcome {
    /// No hook was registered for this event — a no-op skip.
    Skipped,
    /// The hook ran and produced a (possibly unchanged) payload.
    Ran(serde_json::Value),
}

/// Per-unit dispatch context passed to every hook invocation.
///
/// `shared` is the one genuinely user-extensible surface (hooks stash
/// cross-hook data there); everything else is a typed field rather than
/// an open dictionary.
pub struct HookContext {
    pub unit_id: UnitId,
    pub state: LifecycleState,
    pub security: crate::security::SecurityContext,
    shared: Arc<Mutex<HashMap<String, serde_json::Value>>>,
    clock: Arc<dyn Clock>,
}

impl HookContext {
    pub fn new(unit_id: UnitId, state: LifecycleState, clock: Arc<dyn Clock>) -> Self {
        Self {
            unit_id,
            state,
            security: crate::security::SecurityContext::unrestricted(),
            shared: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    pub fn with_security(mut self, security: crate::security::SecurityContext) -> Self {
        self.security = security;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Acquire the shared context map for the duration of `f`. The lock is
    /// held only while `f` runs — never across an `.await` point.
    pub fn with_shared<R>(&self, f: impl FnOnce(&mut HashMap<String, serde_json::Value>) -> R) -> R {
        let mut guard = self.shared.lock();
        f(&mut guard)
    }

    pub fn shared_get(&self, key: &str) -> Option<serde_json::Value> {
        self.with_shared(|m| m.get(key).cloned())
    }

    pub fn shared_set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.with_shared(|m| {
            m.insert(key.into(), value);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    #[test]
    fn hook_event_round_trips_through_display_and_parse() {
        for event in HookEvent::ALL {
            assert_eq!(HookEvent::parse(&event.to_string()), Some(event));
        }
    }

    #[test]
    fn parse_rejects_unknown_name() {
        assert_eq!(HookEvent::parse("on_teardown"), None);
    }

    #[test]
    fn missing_hook_is_none() {
        let hooks = HookSet::new();
        assert!(hooks.get(HookEvent::OnLoad).is_none());
    }

    #[test]
    fn shared_context_is_visible_across_accesses() {
        let ctx = HookContext::new(
            UnitId::parse("g/n").unwrap(),
            LifecycleState::Unloaded,
            Arc::new(SystemClock),
        );
        ctx.shared_set("k", serde_json::json!(42));
        assert_eq!(ctx.shared_get("k"), Some(serde_json::json!(42)));
        assert_eq!(ctx.shared_get("missing"), None);
    }
}
