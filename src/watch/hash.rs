// src/watch/hash.rs

//! Content fingerprints for `use_hash` bindings.
//!
//! A binding with `use_hash = true` only fires when the aggregate hash of
//! every file it matches changed since it last fired. Fingerprints live in
//! memory for the lifetime of the watcher.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let contents = fs
        .read(path)
        .with_context(|| format!("hashing {:?}", path))?;
    Ok(blake3::hash(&contents).to_hex().to_string())
}

/// Deterministic hash over the paths and contents of `paths`, independent
/// of their order.
pub fn compute_aggregate_hash(fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<String> {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();

    let mut hasher = Hasher::new();
    for path in sorted {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(compute_file_hash(fs, path)?.as_bytes());
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, files = paths.len(), "computed aggregate hash");
    Ok(hash)
}

/// Last seen fingerprint per binding.
#[derive(Debug, Default)]
pub struct HashStore {
    hashes: HashMap<String, String>,
}

impl HashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.hashes.get(key).map(String::as_str)
    }

    /// Store `hash` for `key` and report whether it differs from the
    /// previous one. A key seen for the first time counts as changed.
    pub fn update(&mut self, key: &str, hash: String) -> bool {
        let changed = self.get(key) != Some(hash.as_str());
        if changed {
            self.hashes.insert(key.to_string(), hash);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn aggregate_hash_ignores_order_and_tracks_content() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/a.scss", "a");
        fs.add_file("/p/b.scss", "b");
        let a = PathBuf::from("/p/a.scss");
        let b = PathBuf::from("/p/b.scss");

        let h1 = compute_aggregate_hash(&fs, &[a.clone(), b.clone()]).unwrap();
        let h2 = compute_aggregate_hash(&fs, &[b.clone(), a.clone()]).unwrap();
        assert_eq!(h1, h2);

        fs.add_file("/p/b.scss", "b2");
        let h3 = compute_aggregate_hash(&fs, &[a, b]).unwrap();
        assert_ne!(h1, h3);
    }

    #[test]
    fn store_reports_changes_only() {
        let mut store = HashStore::new();
        assert!(store.update("styles", "h1".into()));
        assert!(!store.update("styles", "h1".into()));
        assert!(store.update("styles", "h2".into()));
        assert_eq!(store.get("styles"), Some("h2"));
    }
}
