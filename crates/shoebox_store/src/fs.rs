//! Directory-backed object store.
//!
//! Keys map to file paths under a root directory. Useful as a local mirror
//! target and as the store implementation in tests, where spinning up real
//! buckets is out of the question.

use crate::error::StoreError;
use crate::ObjectStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ObjectStore for FsStore {
    fn name(&self) -> String {
        self.root.display().to_string()
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(prefix) {
                keys.push(name);
            }
        }
        keys.sort();
        debug!("Listed {} keys under prefix '{}'", keys.len(), prefix);
        Ok(keys)
    }

    fn get_object(&self, key: &str, dest_dir: &Path) -> Result<PathBuf, StoreError> {
        let source = self.key_path(key);
        if !source.is_file() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        fs::create_dir_all(dest_dir)?;
        let dest_path = dest_dir.join(key);
        fs::copy(&source, &dest_path)?;
        Ok(dest_path)
    }

    fn put_object(&self, local_path: &Path, key: &str) -> Result<(), StoreError> {
        if !local_path.is_file() {
            return Err(StoreError::Backend {
                key: key.to_string(),
                reason: format!("local file not found: {}", local_path.display()),
            });
        }
        let dest = self.key_path(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(local_path, &dest)?;
        Ok(())
    }
}
