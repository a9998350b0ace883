//! Reads run manifests back into a completed-imports view.
//!
//! Unreadable or malformed manifests are warned about and skipped; one bad
//! file never sinks the reconciliation that depends on this view. Entries
//! whose imported file no longer exists locally (or never existed on this
//! machine) are counted but not returned.

use crate::error::ImportError;
use crate::ledger::ImportLedger;
use shoebox_media::directories::metadata_dir;
use shoebox_media::types::ImportStatus;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The completed-imports view over every run manifest under an import root.
#[derive(Debug, Default)]
pub struct CompletedImports {
    /// Deduplicated, sorted import paths that exist locally.
    pub paths: Vec<PathBuf>,
    /// Completed entries whose file was not found locally; likely imported
    /// on another machine with a different mount path.
    pub not_found: usize,
    /// Total per-file entries inspected.
    pub total_records: usize,
    /// Manifests successfully read.
    pub manifest_count: usize,
    /// Manifests skipped as unreadable or malformed.
    pub unreadable_count: usize,
}

/// Scan `{import_root}/.shoebox/import_*.json` into a completed view.
pub fn completed_imports(import_root: &Path) -> Result<CompletedImports, ImportError> {
    if !import_root.is_dir() {
        return Err(ImportError::RootNotFound(import_root.to_path_buf()));
    }
    let meta_dir = metadata_dir(import_root);
    let mut view = CompletedImports::default();
    if !meta_dir.is_dir() {
        info!(
            "No metadata directory at {}; nothing imported to this root yet",
            meta_dir.display()
        );
        return Ok(view);
    }

    let mut manifest_paths: Vec<PathBuf> = fs::read_dir(&meta_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| {
                    let name = name.to_string_lossy();
                    name.starts_with("import_") && name.ends_with(".json")
                })
                .unwrap_or(false)
        })
        .collect();
    manifest_paths.sort();
    info!(
        "Found {} run manifests in {}",
        manifest_paths.len(),
        meta_dir.display()
    );

    let mut completed: BTreeSet<PathBuf> = BTreeSet::new();
    for manifest_path in manifest_paths {
        let ledger = match ImportLedger::load(&manifest_path) {
            Ok(ledger) => ledger,
            Err(err) => {
                warn!("Skipping unreadable manifest: {}", err);
                view.unreadable_count += 1;
                continue;
            }
        };
        view.manifest_count += 1;
        for record in &ledger.imports {
            view.total_records += 1;
            if record.import_status != ImportStatus::Completed {
                continue;
            }
            let Some(import_path) = &record.import_path else {
                warn!(
                    "Completed record without an import path in {}",
                    manifest_path.display()
                );
                continue;
            };
            if import_path.is_file() {
                completed.insert(import_path.clone());
            } else {
                debug!(
                    "Completed import not found locally, skipping: {}",
                    import_path.display()
                );
                view.not_found += 1;
            }
        }
    }

    view.paths = completed.into_iter().collect();
    info!(
        "Found {} completed imports locally ({} not found, {} records total)",
        view.paths.len(),
        view.not_found,
        view.total_records
    );
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::{Importer, RunMode};
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn import_one(temp: &TempDir, name: &str) -> PathBuf {
        let source = temp.path().join("incoming").join(name);
        fs::create_dir_all(&source).unwrap();
        File::create(source.join(format!("{name}.jpg")))
            .unwrap()
            .write_all(b"pic")
            .unwrap();
        let root = temp.path().join("library");
        fs::create_dir_all(&root).unwrap();
        Importer::new(&source, &root, None, RunMode::Import)
            .process(false)
            .unwrap();
        root
    }

    #[test]
    fn collects_completed_paths_that_exist() {
        let temp = TempDir::new().unwrap();
        let root = import_one(&temp, "run_a");
        import_one(&temp, "run_b");

        let view = completed_imports(&root).unwrap();
        assert_eq!(view.paths.len(), 2);
        assert_eq!(view.manifest_count, 2);
        assert_eq!(view.not_found, 0);
        assert!(view.paths.iter().all(|p| p.is_file()));
    }

    #[test]
    fn missing_files_count_as_foreign() {
        let temp = TempDir::new().unwrap();
        let root = import_one(&temp, "run_a");

        let view = completed_imports(&root).unwrap();
        fs::remove_file(&view.paths[0]).unwrap();

        let again = completed_imports(&root).unwrap();
        assert!(again.paths.is_empty());
        assert_eq!(again.not_found, 1);
    }

    #[test]
    fn malformed_manifests_are_skipped_with_a_warning() {
        let temp = TempDir::new().unwrap();
        let root = import_one(&temp, "run_a");
        fs::write(root.join(".shoebox/import_garbage.json"), b"{not json").unwrap();

        let view = completed_imports(&root).unwrap();
        assert_eq!(view.paths.len(), 1);
        assert_eq!(view.unreadable_count, 1);
    }

    #[test]
    fn empty_root_yields_an_empty_view() {
        let temp = TempDir::new().unwrap();
        let view = completed_imports(temp.path()).unwrap();
        assert!(view.paths.is_empty());
        assert_eq!(view.manifest_count, 0);
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = completed_imports(&temp.path().join("missing")).unwrap_err();
        assert!(matches!(err, ImportError::RootNotFound(_)));
    }

    #[test]
    fn duplicate_imports_are_deduplicated() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("incoming");
        fs::create_dir_all(&source).unwrap();
        File::create(source.join("IMG.jpg"))
            .unwrap()
            .write_all(b"pic")
            .unwrap();
        let root = temp.path().join("library");
        fs::create_dir_all(&root).unwrap();
        let importer = Importer::new(&source, &root, None, RunMode::Import);
        importer.process(false).unwrap();
        importer.process(false).unwrap();

        let view = completed_imports(&root).unwrap();
        assert_eq!(view.paths.len(), 1);
        assert_eq!(view.manifest_count, 2);
    }
}
