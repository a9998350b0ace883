//! Batch imports from an object store.
//!
//! Each remote key is one independent unit of work: download the bundle,
//! unpack it with mtimes preserved, import the extracted tree, then record
//! the key. Units run through the chunked batch runner so a wedged download
//! stalls at most its chunk, and a failed key never aborts its siblings.

use crate::error::ImportError;
use crate::importer::{Importer, RunMode};
use crate::ledger::{KeyFile, SourceIdentity};
use shoebox_archive::codec::unpack_archive;
use shoebox_media::Directories;
use shoebox_runner::run_chunked;
use shoebox_store::ObjectStore;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Concurrent downloads/imports per chunk.
const MAX_CONCURRENT_IMPORTS: usize = 3;

/// Outcome of a multi-key batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub completed: Vec<String>,
    pub failed: Vec<String>,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Imports (or un-imports) archive bundles straight out of an object store.
pub struct StoreImporter<'a> {
    store: &'a dyn ObjectStore,
    dirs: &'a Directories,
    media_import_root: PathBuf,
    library: Option<String>,
    mode: RunMode,
    completed_keys: KeyFile,
    failed_keys: KeyFile,
}

impl<'a> StoreImporter<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        dirs: &'a Directories,
        media_import_root: Option<PathBuf>,
        library: Option<String>,
        mode: RunMode,
    ) -> Self {
        let media_import_root = media_import_root.unwrap_or_else(|| dirs.media_root.clone());
        Self {
            store,
            dirs,
            media_import_root,
            library,
            mode,
            completed_keys: KeyFile::new(dirs.completed_imports_file()),
            failed_keys: KeyFile::new(dirs.failed_imports_file()),
        }
    }

    /// Keys still waiting to be processed: every `.zip` in the store, minus
    /// (when importing) the completed ledger, narrowed by substring filters
    /// when given. Un-import runs see the full listing, since the completed
    /// ledger is exactly what they are there to undo.
    ///
    /// The ledger is advisory; an already-imported key slipping through is
    /// harmless because every file re-checks existence at its target.
    pub fn pending_keys(&self, filters: &[String]) -> Result<Vec<String>, ImportError> {
        let mut keys: Vec<String> = self
            .store
            .list_keys("")?
            .into_iter()
            .filter(|key| key.ends_with(".zip"))
            .collect();
        if self.mode == RunMode::Import {
            let done = self.completed_keys.load()?;
            keys.retain(|key| !done.contains(key));
        }
        if !filters.is_empty() {
            keys.retain(|key| filters.iter().any(|filter| key.contains(filter)));
        }
        keys.sort();
        info!(
            "{} pending archive(s) in {} after filtering",
            keys.len(),
            self.store.name()
        );
        Ok(keys)
    }

    /// Run every pending key through the batch runner.
    pub fn process(&self, filters: &[String]) -> Result<BatchSummary, ImportError> {
        self.dirs.ensure()?;
        let pending = self.pending_keys(filters)?;
        if pending.is_empty() {
            info!("Nothing to import from {}", self.store.name());
            return Ok(BatchSummary::default());
        }

        let outcomes = run_chunked(pending, MAX_CONCURRENT_IMPORTS, |key: &String| {
            self.import_key(key)
        });

        let mut summary = BatchSummary::default();
        for outcome in outcomes {
            match outcome.result {
                Ok(()) => summary.completed.push(outcome.item),
                Err(err) => {
                    warn!("Import failed for key '{}': {}", outcome.item, err);
                    if let Err(err) = self.failed_keys.append(&outcome.item) {
                        warn!("Could not record failed key '{}': {}", outcome.item, err);
                    }
                    summary.failed.push(outcome.item);
                }
            }
        }
        info!(
            "Batch finished: {} imported, {} failed",
            summary.completed.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    /// One unit: download, unpack, import, record.
    fn import_key(&self, key: &str) -> Result<(), ImportError> {
        info!("Importing key: {}", key);
        let zip_path = self.store.get_object(key, &self.dirs.auto_import_dir)?;
        let extracted = unpack_archive(&zip_path, &self.dirs.auto_import_dir)?;
        // The downloaded archive is spent once it unpacked cleanly.
        fs::remove_file(&zip_path)?;

        let importer = Importer::new(
            &extracted,
            &self.media_import_root,
            self.library.clone(),
            self.mode,
        )
        .with_source(SourceIdentity::Remote {
            store: self.store.name(),
            key: key.to_string(),
        });
        importer.process(true)?;

        // Only a fully clean import run marks the key done. Un-imports leave
        // the ledger alone; it is advisory and existence checks stay
        // authoritative either way.
        if self.mode == RunMode::Import {
            self.completed_keys.append(key)?;
        }
        info!("Completed key: {}", key);
        Ok(())
    }
}
