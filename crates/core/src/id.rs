// SPDX-License-Identifier: MIT

//! Unit identity: `group/name` ids.
//!
//! Unlike the random, nanoid-backed ids used for transient objects (agent
//! runs, session handles) elsewhere in this lineage, a [`UnitId`] is not
//! generated — it is declared in a manifest and is stable across the
//! process's whole lifetime. It still borrows the nanoid-backed inline
//! buffer idiom for cheap `Clone`/`Hash`/`Borrow<str>` ergonomics.

use std::borrow::Borrow;
use std::fmt;

/// Maximum byte length for a unit id (`group/name`).
pub const UNIT_ID_MAX_LEN: usize = 96;

/// A validated `group/name` unit identifier.
///
/// Construction enforces: non-empty, exactly one `/`, non-empty `group`
/// and `name` segments. Equality and hashing are case-sensitive and
/// compare the full string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct UnitId {
    raw: String,
    /// Byte offset of the `/` separator, cached at construction so
    /// `group()`/`name()` never need to re-search (or fail) to split it.
    slash: usize,
}

impl UnitId {
    /// Parse a `group/name` string, validating the split point exists and
    /// both segments are non-empty. Does not check the group-prefix
    /// invariant against a manifest's separately-declared `group` field —
    /// that check lives in [`crate::manifest::Manifest::validate`], since
    /// manifests in this implementation don't carry a redundant `group`
    /// field (the `group` is *defined* as the prefix before `/`).
    pub fn parse(id: impl Into<String>) -> Result<Self, crate::error::CoreError> {
        let id = id.into();
        if id.len() > UNIT_ID_MAX_LEN {
            return Err(crate::error::CoreError::InvalidUnitId {
                id,
                reason: format!("exceeds {UNIT_ID_MAX_LEN} bytes"),
            });
        }
        let Some(slash) = id.find('/') else {
            return Err(crate::error::CoreError::InvalidUnitId {
                id,
                reason: "missing '/' separator".into(),
            });
        };
        let (group, rest) = id.split_at(slash);
        let name = &rest[1..];
        if group.is_empty() || name.is_empty() {
            return Err(crate::error::CoreError::InvalidUnitId {
                id,
                reason: "empty group or name segment".into(),
            });
        }
        if name.contains('/') {
            return Err(crate::error::CoreError::InvalidUnitId {
                id,
                reason: "name segment must not contain '/'".into(),
            });
        }
        Ok(Self { raw: id, slash })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The `group` segment: everything before the first `/`.
    pub fn group(&self) -> &str {
        &self.raw[..self.slash]
    }

    /// The `name` segment: everything after the first `/`.
    pub fn name(&self) -> &str {
        &self.raw[self.slash + 1..]
    }
}

impl fmt::Debug for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitId({:?})", self.raw)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Borrow<str> for UnitId {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl AsRef<str> for UnitId {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl serde::Serialize for UnitId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> serde::Deserialize<'de> for UnitId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        UnitId::parse(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
