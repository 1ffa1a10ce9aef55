// SPDX-License-Identifier: MIT

//! Bounded audit trail of configuration-mutating actions, ported from `ConfigurationManager._audit`'s
//! last-1000-entries ring buffer.

use aeon_core::UnitId;
use std::collections::VecDeque;

pub const AUDIT_LOG_CAPACITY: usize = 1_000;

#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditEntry {
    pub timestamp_ms: i64,
    pub action: AuditAction,
    pub unit: UnitId,
    pub key: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    SetRuntimeOverride,
    ClearRuntimeOverride,
    SetSecret,
    LoadSystemConfig,
    LoadUserConfig,
}

/// Fixed-capacity ring buffer: pushing past [`AUDIT_LOG_CAPACITY`] drops
/// the oldest entry.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: VecDeque<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: AuditEntry) {
        if self.entries.len() >= AUDIT_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
