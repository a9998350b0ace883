//! Durable run manifests and flat key-set ledgers.
//!
//! The JSON run manifest is rewritten in full after every file processed, so
//! a crash mid-run leaves a manifest reflecting everything up to the last
//! successful write. Re-running is safe regardless: destination existence is
//! re-checked on disk, never trusted from a ledger.

use crate::error::ImportError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use shoebox_media::directories::metadata_dir;
use shoebox_media::types::MediaRecord;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Where an import run's media came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceIdentity {
    /// A directory already on this machine.
    Local { path: PathBuf },
    /// A bundle downloaded from an object store.
    Remote { store: String, key: String },
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportCounters {
    pub total_imported: u64,
    pub picture_imports: u64,
    pub movie_imports: u64,
    pub audio_imports: u64,
    pub already_imported: u64,
    pub not_imported: u64,
    pub un_imported: u64,
}

/// One run's durable manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLedger {
    /// Run stamp, `%Y%m%d_%H%M%S`, also part of the manifest file name.
    pub run_stamp: String,
    pub source_directory: PathBuf,
    pub source: SourceIdentity,
    pub media_import_root: PathBuf,
    pub library: Option<String>,
    pub unimport: bool,
    pub imports: Vec<MediaRecord>,
    pub counters: ImportCounters,
    #[serde(skip)]
    path: PathBuf,
}

impl ImportLedger {
    /// Build a manifest for a fresh run and choose its on-disk location
    /// under `{import_root}/.shoebox/`.
    pub fn new(
        source_directory: &Path,
        source: SourceIdentity,
        media_import_root: &Path,
        library: Option<String>,
        unimport: bool,
        imports: Vec<MediaRecord>,
    ) -> Self {
        let run_stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        // The stamp alone collides across concurrent batch units and
        // same-second re-runs; pid and a process-wide sequence keep every
        // run's manifest distinct.
        let seq = RUN_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = metadata_dir(media_import_root).join(format!(
            "import_{}_{}_{}.json",
            run_stamp,
            std::process::id(),
            seq
        ));
        Self {
            run_stamp,
            source_directory: source_directory.to_path_buf(),
            source,
            media_import_root: media_import_root.to_path_buf(),
            library,
            unimport,
            imports,
            counters: ImportCounters::default(),
            path,
        }
    }

    /// Load a manifest from disk (used by the completed-imports reader).
    pub fn load(path: &Path) -> Result<Self, ImportError> {
        let contents = fs::read_to_string(path).map_err(|err| ImportError::Ledger {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let mut ledger: Self =
            serde_json::from_str(&contents).map_err(|err| ImportError::Ledger {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        ledger.path = path.to_path_buf();
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the manifest in full.
    pub fn persist(&self) -> Result<(), ImportError> {
        let to_ledger_err = |reason: String| ImportError::Ledger {
            path: self.path.clone(),
            reason,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| to_ledger_err(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| to_ledger_err(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| to_ledger_err(e.to_string()))?;
        debug!("Persisted run manifest: {}", self.path.display());
        Ok(())
    }
}

/// Append-only flat text ledger, one key per line.
///
/// Appends are serialized through an internal mutex: batch units sharing one
/// `KeyFile` may complete concurrently.
#[derive(Debug)]
pub struct KeyFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl KeyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The set of keys currently recorded. A missing file is an empty set.
    pub fn load(&self) -> Result<HashSet<String>, ImportError> {
        if !self.path.is_file() {
            return Ok(HashSet::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Append one key. Safe to call from concurrent batch units.
    pub fn append(&self, key: &str) -> Result<(), ImportError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{key}")?;
        debug!("Recorded key '{}' in {}", key, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_media::types::{MediaKind, MediaRecord};
    use tempfile::TempDir;

    #[test]
    fn manifest_persists_and_loads() {
        let temp = TempDir::new().unwrap();
        let record = MediaRecord::new(
            Path::new("/in/IMG_1.jpg"),
            Local::now(),
            42,
            MediaKind::Picture,
        );
        let mut ledger = ImportLedger::new(
            Path::new("/in"),
            SourceIdentity::Local {
                path: PathBuf::from("/in"),
            },
            temp.path(),
            Some("family".into()),
            false,
            vec![record],
        );
        ledger.counters.total_imported = 1;
        ledger.persist().unwrap();

        let loaded = ImportLedger::load(ledger.path()).unwrap();
        assert_eq!(loaded.counters.total_imported, 1);
        assert_eq!(loaded.library.as_deref(), Some("family"));
        assert_eq!(loaded.imports.len(), 1);
        assert!(!loaded.unimport);
    }

    #[test]
    fn manifest_lives_under_the_metadata_dir() {
        let temp = TempDir::new().unwrap();
        let ledger = ImportLedger::new(
            Path::new("/in"),
            SourceIdentity::Local {
                path: PathBuf::from("/in"),
            },
            temp.path(),
            None,
            false,
            Vec::new(),
        );
        assert!(ledger.path().starts_with(temp.path().join(".shoebox")));
        let name = ledger.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("import_") && name.ends_with(".json"));
    }

    #[test]
    fn key_file_round_trips_and_dedups_via_set() {
        let temp = TempDir::new().unwrap();
        let keys = KeyFile::new(temp.path().join("completed.txt"));
        assert!(keys.load().unwrap().is_empty());

        keys.append("a.zip").unwrap();
        keys.append("b.zip").unwrap();
        keys.append("a.zip").unwrap();

        let loaded = keys.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains("a.zip"));
        assert!(loaded.contains("b.zip"));
    }

    #[test]
    fn concurrent_appends_do_not_interleave() {
        let temp = TempDir::new().unwrap();
        let keys = KeyFile::new(temp.path().join("completed.txt"));
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let keys = &keys;
                scope.spawn(move || {
                    for i in 0..25 {
                        keys.append(&format!("key_{worker}_{i}.zip")).unwrap();
                    }
                });
            }
        });
        let loaded = keys.load().unwrap();
        assert_eq!(loaded.len(), 200);
    }
}
