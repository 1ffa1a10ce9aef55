// SPDX-License-Identifier: MIT

//! Manifest discovery: scanning a directory tree for `*.json` manifest
//! documents, plus [`resolve_under_root`] — the shared path-traversal
//! guard an instruction document's `refs.configs`, `expected_files[]`,
//! and `outputs.result` paths are all resolved through before use.

use crate::document::parse_document;
use crate::error::ManifestError;
use aeon_core::Manifest;
use std::path::{Component, Path, PathBuf};

/// One discovered manifest file, either parsed or skipped with its error.
pub struct DiscoveryResult {
    pub manifests: Vec<Manifest>,
    pub skipped: Vec<(PathBuf, ManifestError)>,
}

/// Recursively scan `dir` for `*.json` files and parse each as a manifest
/// document. Unreadable or invalid files are collected in `skipped`
/// rather than aborting the whole scan.
pub fn discover_dir(dir: &Path) -> Result<DiscoveryResult, ManifestError> {
    let mut manifests = Vec::new();
    let mut skipped = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(_) if current == dir => return Ok(DiscoveryResult { manifests, skipped }),
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match load_file(&path) {
                Ok(manifest) => manifests.push(manifest),
                Err(err) => skipped.push((path, err)),
            }
        }
    }

    Ok(DiscoveryResult { manifests, skipped })
}

/// Read and parse a single manifest document file.
pub fn load_file(path: &Path) -> Result<Manifest, ManifestError> {
    let display = path.display().to_string();
    let text =
        std::fs::read_to_string(path).map_err(|source| ManifestError::Io { path: display.clone(), source })?;
    parse_document(&text, &display)
}

/// Resolve a caller-supplied relative path against `root`, rejecting any
/// path that would escape it via `..` components or an absolute prefix
///.
pub fn resolve_under_root(root: &Path, requested: &str) -> Result<PathBuf, ManifestError> {
    let requested_path = Path::new(requested);
    if requested_path.is_absolute() {
        return Err(ManifestError::PathTraversal(requested.to_string()));
    }
    if requested_path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ManifestError::PathTraversal(requested.to_string()));
    }
    Ok(root.join(requested_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_dir_finds_nested_manifests() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"schema":"aeon.unit","version":"1.0","id":"g/a"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("nested/b.json"),
            r#"{"schema":"aeon.unit","version":"1.0","id":"g/b"}"#,
        )
        .unwrap();

        let result = discover_dir(dir.path()).unwrap();
        assert_eq!(result.manifests.len(), 2);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn discover_dir_skips_invalid_files_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "not json").unwrap();
        std::fs::write(
            dir.path().join("good.json"),
            r#"{"schema":"aeon.unit","version":"1.0","id":"g/a"}"#,
        )
        .unwrap();

        let result = discover_dir(dir.path()).unwrap();
        assert_eq!(result.manifests.len(), 1);
        assert_eq!(result.skipped.len(), 1);
    }

    #[test]
    fn resolve_under_root_rejects_parent_traversal() {
        let root = Path::new("/var/aeon/units");
        assert!(resolve_under_root(root, "../../etc/passwd").is_err());
    }

    #[test]
    fn resolve_under_root_rejects_absolute_path() {
        let root = Path::new("/var/aeon/units");
        assert!(resolve_under_root(root, "/etc/passwd").is_err());
    }

    #[test]
    fn resolve_under_root_accepts_relative_path() {
        let root = Path::new("/var/aeon/units");
        let resolved = resolve_under_root(root, "group/unit.json").unwrap();
        assert_eq!(resolved, root.join("group/unit.json"));
    }
}
