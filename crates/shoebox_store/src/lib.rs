//! Object-store boundary.
//!
//! The rest of the workspace only ever sees [`ObjectStore`]: an opaque
//! key-to-blob store with list/get/put. The S3 implementation hides its async
//! SDK behind an owned runtime so callers stay blocking; the directory-backed
//! implementation serves tests and local mirror targets.

pub mod error;
pub mod fs;
pub mod s3;

pub use error::StoreError;
pub use fs::FsStore;
pub use s3::S3Store;

use std::path::{Path, PathBuf};

/// A key-to-blob store. All operations are blocking.
pub trait ObjectStore: Send + Sync {
    /// Human-readable identity of the store (bucket name, directory path),
    /// used in manifests and log lines.
    fn name(&self) -> String;

    /// Keys beginning with `prefix` (empty prefix lists everything).
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Download `key` into `dest_dir`, returning the local file path.
    fn get_object(&self, key: &str, dest_dir: &Path) -> Result<PathBuf, StoreError>;

    /// Upload the file at `local_path` under `key`.
    fn put_object(&self, local_path: &Path, key: &str) -> Result<(), StoreError>;
}
