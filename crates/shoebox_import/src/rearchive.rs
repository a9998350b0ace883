//! Re-archiving of bundles already in the object store.
//!
//! Old bundles predate the current size cap and provenance format, or need
//! to be re-cut into a different library. Each listed key is pulled down,
//! unpacked, bundled again through the regular archiver and uploaded, with
//! its own completed/failed ledgers mirroring the import batch.

use crate::error::ImportError;
use crate::ledger::KeyFile;
use crate::remote::BatchSummary;
use shoebox_archive::archiver::{upload_bundles, Archiver};
use shoebox_archive::codec::unpack_archive;
use shoebox_archive::words;
use shoebox_media::Directories;
use shoebox_runner::run_chunked;
use shoebox_store::ObjectStore;
use std::fs;
use tracing::{info, warn};

/// Concurrent re-archive units per chunk. Each unit holds a download, an
/// unpack and a pack at once, so this stays below the import ceiling.
const MAX_CONCURRENT_REARCHIVES: usize = 2;

/// Re-bundles remote archives listed in the re-archive ledger.
pub struct ReArchiver<'a> {
    store: &'a dyn ObjectStore,
    dirs: &'a Directories,
    library: Option<String>,
    max_bundle_bytes: u64,
    completed_keys: KeyFile,
    failed_keys: KeyFile,
}

impl<'a> ReArchiver<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        dirs: &'a Directories,
        library: Option<String>,
        max_bundle_bytes: u64,
    ) -> Self {
        Self {
            store,
            dirs,
            library,
            max_bundle_bytes,
            completed_keys: KeyFile::new(dirs.rearchive_complete_file()),
            failed_keys: KeyFile::new(dirs.rearchive_failed_file()),
        }
    }

    /// Keys listed for re-archiving minus those already completed.
    pub fn pending_keys(&self) -> Result<Vec<String>, ImportError> {
        let listed = KeyFile::new(self.dirs.rearchive_file()).load()?;
        let done = self.completed_keys.load()?;
        let mut pending: Vec<String> = listed.difference(&done).cloned().collect();
        pending.sort();
        info!(
            "{} of {} listed keys still need re-archiving",
            pending.len(),
            listed.len()
        );
        Ok(pending)
    }

    pub fn process(&self) -> Result<BatchSummary, ImportError> {
        self.dirs.ensure()?;
        let pending = self.pending_keys()?;
        if pending.is_empty() {
            info!("Nothing to re-archive");
            return Ok(BatchSummary::default());
        }

        let outcomes = run_chunked(pending, MAX_CONCURRENT_REARCHIVES, |key: &String| {
            self.rearchive_key(key)
        });

        let mut summary = BatchSummary::default();
        for outcome in outcomes {
            match outcome.result {
                Ok(()) => summary.completed.push(outcome.item),
                Err(err) => {
                    warn!("Re-archive failed for key '{}': {}", outcome.item, err);
                    if let Err(err) = self.failed_keys.append(&outcome.item) {
                        warn!("Could not record failed key '{}': {}", outcome.item, err);
                    }
                    summary.failed.push(outcome.item);
                }
            }
        }
        info!(
            "Re-archive finished: {} completed, {} failed",
            summary.completed.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    /// One unit: download, unpack, bundle again, upload, record.
    fn rearchive_key(&self, key: &str) -> Result<(), ImportError> {
        info!("Re-archiving key: {}", key);
        let zip_path = self.store.get_object(key, &self.dirs.archive_files_dir)?;
        let extracted = unpack_archive(&zip_path, &self.dirs.archive_files_dir)?;
        fs::remove_file(&zip_path)?;

        let keyword = keyword_from_bundle_name(key).unwrap_or_else(words::identity_word);
        let mut archiver = Archiver::new(
            &extracted,
            &self.dirs.archive_files_dir,
            Some(keyword),
            self.library.clone(),
        );
        let outcome = archiver.process(self.max_bundle_bytes)?;
        upload_bundles(self.store, &outcome.zip_paths)?;

        // The extracted tree was drained by the archive moves; drop the husk.
        fs::remove_dir_all(&extracted)?;
        self.completed_keys.append(key)?;
        info!("Completed re-archiving key: {}", key);
        Ok(())
    }
}

/// Identity word baked into a bundle key (`yyyymmdd-yyyymmdd_word.zip`).
fn keyword_from_bundle_name(key: &str) -> Option<String> {
    let stem = key.strip_suffix(".zip").unwrap_or(key);
    let (_, word) = stem.rsplit_once('_')?;
    if word.is_empty() {
        None
    } else {
        Some(word.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_archive::archiver::MAX_BUNDLE_BYTES;
    use shoebox_store::FsStore;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn keyword_is_recovered_from_bundle_keys() {
        assert_eq!(
            keyword_from_bundle_name("20190113-20200103_colin.zip").as_deref(),
            Some("colin")
        );
        assert_eq!(keyword_from_bundle_name("plainname.zip"), None);
        assert_eq!(keyword_from_bundle_name("trailing_.zip"), None);
    }

    #[test]
    fn rearchives_listed_keys_and_records_completion() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path().join("bucket")).unwrap();
        let dirs = Directories::resolve(
            Some(temp.path().join("home")),
            Some(temp.path().join("inbox")),
        )
        .unwrap();
        dirs.ensure().unwrap();

        // Seed the bucket with one bundle produced the normal way.
        let source = temp.path().join("phone");
        fs::create_dir_all(&source).unwrap();
        for file in ["IMG_1.jpg", "clip.mp4"] {
            File::create(source.join(file))
                .unwrap()
                .write_all(b"media")
                .unwrap();
        }
        let staging = temp.path().join("seed_staging");
        let mut archiver = Archiver::new(&source, &staging, Some("colin".to_string()), None);
        let outcome = archiver.process(MAX_BUNDLE_BYTES).unwrap();
        upload_bundles(&store, &outcome.zip_paths).unwrap();
        let key = outcome.zip_paths[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();

        // List it for re-archiving.
        KeyFile::new(dirs.rearchive_file()).append(&key).unwrap();

        let rearchiver = ReArchiver::new(&store, &dirs, None, MAX_BUNDLE_BYTES);
        let summary = rearchiver.process().unwrap();
        assert_eq!(summary.completed, vec![key.clone()]);
        assert!(summary.failed.is_empty());

        // The key keeps its identity word and is marked complete.
        let done = KeyFile::new(dirs.rearchive_complete_file()).load().unwrap();
        assert!(done.contains(&key));
        assert!(store
            .list_keys("")
            .unwrap()
            .iter()
            .any(|k| k.ends_with("_colin.zip")));

        // A second pass has nothing left to do.
        assert!(rearchiver.pending_keys().unwrap().is_empty());
    }
}
