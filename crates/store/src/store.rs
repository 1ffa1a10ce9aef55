// SPDX-License-Identifier: MIT

//! `FileStateStore`: one JSON document under `<root>/runtime/states/state.json`,
//! written with a write-then-rename plus `.bak`-rotation idiom.

use crate::error::StoreError;
use crate::record::UnitRecord;
use aeon_core::UnitId;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_BAK_FILES: u32 = 3;

#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
struct StoreDocument {
    records: HashMap<UnitId, UnitRecord>,
}

/// Persistent key-value state store keyed by unit id (C2).
///
/// Reads go through an `RwLock` over the in-memory document; writes are
/// serialized by a separate mutex guarding only the write-then-rename
/// critical section, so concurrent reads never block on a write in
/// flight beyond the final atomic swap.
pub struct FileStateStore {
    path: PathBuf,
    document: RwLock<StoreDocument>,
    write_guard: Mutex<()>,
}

impl FileStateStore {
    /// Open (or create) the store at `path`. If the file exists, it is
    /// loaded; if it is missing, an empty document is used and will be
    /// created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let document = if path.exists() {
            load_document(&path)?
        } else {
            StoreDocument::default()
        };
        Ok(Self { path, document: RwLock::new(document), write_guard: Mutex::new(()) })
    }

    pub fn get(&self, id: &UnitId) -> Option<UnitRecord> {
        self.document.read().records.get(id).cloned()
    }

    pub fn put_state(&self, id: UnitId, state: aeon_core::LifecycleState) -> Result<(), StoreError> {
        let _guard = self.write_guard.lock();
        let now = Utc::now();
        {
            let mut doc = self.document.write();
            doc.records
                .entry(id)
                .and_modify(|r| {
                    r.state = state;
                    r.updated_at = now;
                })
                .or_insert_with(|| UnitRecord::new(state, now));
        }
        self.persist()
    }

    pub fn put_result(&self, id: UnitId, payload: serde_json::Value) -> Result<(), StoreError> {
        let _guard = self.write_guard.lock();
        let now = Utc::now();
        {
            let mut doc = self.document.write();
            let record = doc
                .records
                .entry(id.clone())
                .or_insert_with(|| UnitRecord::new(aeon_core::LifecycleState::Unloaded, now));
            record.result = Some(payload);
            record.updated_at = now;
        }
        self.persist()
    }

    pub fn delete(&self, id: &UnitId) -> Result<(), StoreError> {
        let _guard = self.write_guard.lock();
        self.document.write().records.remove(id);
        self.persist()
    }

    pub fn reset_all(&self) -> Result<(), StoreError> {
        let _guard = self.write_guard.lock();
        self.document.write().records.clear();
        self.persist()
    }

    pub fn all(&self) -> HashMap<UnitId, UnitRecord> {
        self.document.read().records.clone()
    }

    /// Serialize the in-memory document and atomically replace the
    /// on-disk file: write to `state.json.tmp`, then `rename` over the
    /// final path, rotating any existing file into `.bak`/`.bak.N` first.
    fn persist(&self) -> Result<(), StoreError> {
        let doc = self.document.read();
        let json = serde_json::to_vec_pretty(&*doc)?;
        drop(doc);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| StoreError::Write { path: parent.display().to_string(), source })?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &json)
            .map_err(|source| StoreError::Write { path: tmp_path.display().to_string(), source })?;

        if self.path.exists() {
            let bak = rotate_bak_path(&self.path);
            let _ = fs::rename(&self.path, bak);
        }

        fs::rename(&tmp_path, &self.path)
            .map_err(|source| StoreError::Write { path: self.path.display().to_string(), source })?;

        Ok(())
    }
}

fn load_document(path: &Path) -> Result<StoreDocument, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::Read { path: path.display().to_string(), source })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse { path: path.display().to_string(), source })
}

/// Pick the next `.bak`/`.bak.N` path, rotating older backups out. Keeps
/// up to [`MAX_BAK_FILES`] generations; the oldest is dropped at capacity.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}
