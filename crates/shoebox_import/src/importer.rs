//! The per-file import/unimport state machine and its run loop.
//!
//! Each record moves through a strict sequence: classify, compute target,
//! check existence on disk, copy or delete. The run manifest is rewritten
//! after every file, and the completed-key ledger is only touched by callers
//! once a whole run finished cleanly.

use crate::error::ImportError;
use crate::ledger::{ImportCounters, ImportLedger, SourceIdentity};
use chrono::Datelike;
use filetime::FileTime;
use shoebox_archive::provenance::{read_provenance, DEFAULT_LIBRARY, PROVENANCE_FILE_NAME};
use shoebox_media::directories::kind_dir_name;
use shoebox_media::scanner;
use shoebox_media::types::{ImportStatus, MediaKind, MediaRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Direction of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Import,
    Unimport,
}

/// One import (or unimport) run over a single source directory.
pub struct Importer {
    source_dir: PathBuf,
    media_import_root: PathBuf,
    library: Option<String>,
    mode: RunMode,
    source: SourceIdentity,
}

impl Importer {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        media_import_root: impl Into<PathBuf>,
        library: Option<String>,
        mode: RunMode,
    ) -> Self {
        let source_dir = source_dir.into();
        let source = SourceIdentity::Local {
            path: source_dir.clone(),
        };
        Self {
            source_dir,
            media_import_root: media_import_root.into(),
            library,
            mode,
            source,
        }
    }

    /// Record a remote origin in the run manifest (store imports).
    pub fn with_source(mut self, source: SourceIdentity) -> Self {
        self.source = source;
        self
    }

    /// Explicit library wins; otherwise the provenance file in the source
    /// directory decides, unless it names the default.
    fn resolve_library(&self) -> Option<String> {
        if self.library.is_some() {
            return self.library.clone();
        }
        match read_provenance(&self.source_dir) {
            Ok(provenance) if provenance.library != DEFAULT_LIBRARY => {
                info!("Detected library '{}' from provenance", provenance.library);
                Some(provenance.library)
            }
            Ok(_) => None,
            Err(err) => {
                debug!("No usable provenance in source: {}", err);
                None
            }
        }
    }

    /// Run the state machine over every scanned record.
    ///
    /// Returns the aggregate counters. `delete_source_on_success` removes
    /// the source directory after a clean run (extracted downloads).
    pub fn process(&self, delete_source_on_success: bool) -> Result<ImportCounters, ImportError> {
        if !self.media_import_root.is_dir() {
            return Err(ImportError::RootNotFound(self.media_import_root.clone()));
        }
        let scan = scanner::scan(&self.source_dir)?;
        let library = self.resolve_library();
        let destination_root = match &library {
            Some(library) => self.media_import_root.join(library),
            None => self.media_import_root.clone(),
        };
        info!(
            "{} {} files from {} into {}",
            match self.mode {
                RunMode::Import => "Importing",
                RunMode::Unimport => "Un-importing",
            },
            scan.records.len(),
            self.source_dir.display(),
            destination_root.display()
        );

        let mut ledger = ImportLedger::new(
            &self.source_dir,
            self.source.clone(),
            &self.media_import_root,
            library,
            self.mode == RunMode::Unimport,
            scan.records,
        );
        // Header lands on disk before the first file is touched.
        ledger.persist()?;

        for index in 0..ledger.imports.len() {
            self.transition(
                &mut ledger.imports[index],
                &destination_root,
                &mut ledger.counters,
            )?;
            ledger.persist()?;
        }

        info!(
            "Run complete: {} imported, {} already present, {} not imported, {} un-imported",
            ledger.counters.total_imported,
            ledger.counters.already_imported,
            ledger.counters.not_imported,
            ledger.counters.un_imported
        );

        if delete_source_on_success {
            info!("Removing source directory: {}", self.source_dir.display());
            fs::remove_dir_all(&self.source_dir)?;
        }
        Ok(ledger.counters)
    }

    /// Advance one record. Statuses mutate exactly once per terminal
    /// operation; a copy failure aborts the whole run.
    fn transition(
        &self,
        record: &mut MediaRecord,
        destination_root: &Path,
        counters: &mut ImportCounters,
    ) -> Result<(), ImportError> {
        // Bundle metadata, not media; leaves the run untouched.
        if record.file_name == PROVENANCE_FILE_NAME {
            debug!("Skipping provenance file: {}", record.path.display());
            return Ok(());
        }
        let Some(subtree) = kind_dir_name(record.kind) else {
            debug!("Unknown file type will not be imported: {}", record.file_name);
            record.import_status = ImportStatus::DoNotImport;
            counters.not_imported += 1;
            return Ok(());
        };

        let year = record.capture.year();
        let month = record.capture.month();
        let target_dir = destination_root
            .join(subtree)
            .join(year.to_string())
            .join(format!("{year}-{month:02}"));
        let target = target_dir.join(record.prefixed_name());

        match self.mode {
            RunMode::Import => {
                if target.is_file() {
                    debug!("Already imported: {}", target.display());
                    record.import_status = ImportStatus::AlreadyExists;
                    record.import_path = Some(target);
                    counters.already_imported += 1;
                    return Ok(());
                }
                fs::create_dir_all(&target_dir)?;
                copy_preserving(&record.path, &target).map_err(|source| ImportError::Copy {
                    file: record.path.clone(),
                    dest: target.clone(),
                    source,
                })?;
                debug!("Imported {} to {}", record.path.display(), target.display());
                record.import_status = ImportStatus::Completed;
                record.import_path = Some(target);
                counters.total_imported += 1;
                match record.kind {
                    MediaKind::Picture => counters.picture_imports += 1,
                    MediaKind::Movie => counters.movie_imports += 1,
                    MediaKind::Audio => counters.audio_imports += 1,
                    MediaKind::Unknown => {}
                }
            }
            RunMode::Unimport => {
                if target.is_file() {
                    fs::remove_file(&target).map_err(|source| ImportError::Delete {
                        file: target.clone(),
                        source,
                    })?;
                    info!("Un-imported: {}", target.display());
                    record.import_status = ImportStatus::Unimported;
                    record.import_path = Some(target);
                    counters.un_imported += 1;
                } else {
                    // Already absent; nothing to record.
                    debug!("Not present, nothing to un-import: {}", target.display());
                }
            }
        }
        Ok(())
    }
}

/// Copy with mtime preserved, so capture-time fallbacks survive the hop.
fn copy_preserving(source: &Path, dest: &Path) -> std::io::Result<()> {
    let metadata = fs::metadata(source)?;
    fs::copy(source, dest)?;
    filetime::set_file_mtime(dest, FileTime::from_last_modification_time(&metadata))?;
    Ok(())
}
