//! Reconciliation of completed imports against the remote-upload ledger.
//!
//! Pending work is the set difference: locally completed imports whose
//! remote counterpart is neither in the ledger nor present on the remote.
//! The ledger is rewritten after every single confirmation, bounding crash
//! loss to one in-flight transfer.

use crate::error::SyncError;
use crate::mega::RemoteSync;
use chrono::Local;
use serde::{Deserialize, Serialize};
use shoebox_import::reader::completed_imports;
use shoebox_media::directories::metadata_dir;
use shoebox_media::types::COMPACT_STAMP;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// File name of the remote-sync ledger under the metadata directory.
pub const SYNC_LEDGER_FILE: &str = "remote_sync.json";

/// Retry ceiling per item, including the first attempt.
const MAX_ATTEMPTS: usize = 5;

/// Fixed backoff between attempts.
const RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// Remote paths confirmed present, with the time of the last update.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncLedger {
    pub update_time: String,
    pub completed_uploads: BTreeSet<String>,
    #[serde(skip)]
    path: PathBuf,
}

impl SyncLedger {
    /// Load the ledger for `import_root`, or start empty when none exists.
    pub fn load(import_root: &Path) -> Result<Self, SyncError> {
        let path = metadata_dir(import_root).join(SYNC_LEDGER_FILE);
        if !path.is_file() {
            return Ok(Self {
                update_time: Local::now().format(COMPACT_STAMP).to_string(),
                completed_uploads: BTreeSet::new(),
                path,
            });
        }
        let contents = fs::read_to_string(&path).map_err(|err| SyncError::Ledger {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        let mut ledger: Self =
            serde_json::from_str(&contents).map_err(|err| SyncError::Ledger {
                path: path.clone(),
                reason: err.to_string(),
            })?;
        ledger.path = path;
        Ok(ledger)
    }

    pub fn contains(&self, remote_path: &str) -> bool {
        self.completed_uploads.contains(remote_path)
    }

    /// Record one confirmed remote path and rewrite the ledger immediately.
    pub fn record(&mut self, remote_path: &str) -> Result<(), SyncError> {
        self.completed_uploads.insert(remote_path.to_string());
        self.update_time = Local::now().format(COMPACT_STAMP).to_string();
        self.persist()
    }

    fn persist(&self) -> Result<(), SyncError> {
        let to_ledger_err = |reason: String| SyncError::Ledger {
            path: self.path.clone(),
            reason,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| to_ledger_err(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| to_ledger_err(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| to_ledger_err(e.to_string()))?;
        debug!("Persisted sync ledger: {}", self.path.display());
        Ok(())
    }
}

/// How one item was reconciled.
enum ItemOutcome {
    AlreadyOnRemote,
    Uploaded,
}

/// Summary of one reconciliation run. A non-empty `failed` list never rolls
/// back successes already recorded in the ledger.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Confirmed present without an upload.
    pub already_on_remote: Vec<String>,
    /// Freshly uploaded this run.
    pub uploaded: Vec<String>,
    /// Skipped: already in the ledger.
    pub already_recorded: usize,
    /// Skipped: path does not live under this machine's import root.
    pub foreign: usize,
    /// Items that exhausted their retry ceiling.
    pub failed: Vec<PathBuf>,
}

impl ReconcileReport {
    pub fn reconciled(&self) -> usize {
        self.already_on_remote.len() + self.uploaded.len()
    }
}

/// Drives one reconciliation run over a single import root.
pub struct SyncReconciler<'a> {
    runner: &'a dyn RemoteSync,
    import_root: PathBuf,
    remote_root: String,
    max_attempts: usize,
    backoff: Duration,
}

impl<'a> SyncReconciler<'a> {
    pub fn new(
        runner: &'a dyn RemoteSync,
        import_root: impl Into<PathBuf>,
        remote_root: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            import_root: import_root.into(),
            remote_root: remote_root.into(),
            max_attempts: MAX_ATTEMPTS,
            backoff: RETRY_BACKOFF,
        }
    }

    /// Shrink the retry budget (tests; cautious callers).
    pub fn with_retry(mut self, max_attempts: usize, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Remote counterpart of a local import path, or `None` for paths that
    /// do not live under this machine's import root (imported elsewhere,
    /// different mount). Those cannot be reconciled from here.
    fn remote_path_for(&self, local_path: &Path) -> Option<String> {
        let rel = local_path.strip_prefix(&self.import_root).ok()?;
        let rel: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let root = self.remote_root.trim_end_matches('/');
        Some(format!("{}/{}", root, rel.join("/")))
    }

    /// Run the full reconciliation.
    pub fn sync(&self) -> Result<ReconcileReport, SyncError> {
        let completed = completed_imports(&self.import_root)?;
        let mut ledger = SyncLedger::load(&self.import_root)?;
        info!(
            "Reconciling {} completed imports against {} recorded uploads",
            completed.paths.len(),
            ledger.completed_uploads.len()
        );

        let mut report = ReconcileReport::default();
        for local_path in &completed.paths {
            let Some(remote_path) = self.remote_path_for(local_path) else {
                debug!(
                    "Foreign import path, skipping: {}",
                    local_path.display()
                );
                report.foreign += 1;
                continue;
            };
            if ledger.contains(&remote_path) {
                debug!("Already uploaded: {}", remote_path);
                report.already_recorded += 1;
                continue;
            }
            match self.reconcile_item(local_path, &remote_path) {
                Ok(ItemOutcome::AlreadyOnRemote) => {
                    ledger.record(&remote_path)?;
                    report.already_on_remote.push(remote_path);
                }
                Ok(ItemOutcome::Uploaded) => {
                    ledger.record(&remote_path)?;
                    report.uploaded.push(remote_path);
                }
                Err(err) => {
                    warn!(
                        "Giving up on {} after {} attempts: {}",
                        local_path.display(),
                        self.max_attempts,
                        err
                    );
                    report.failed.push(local_path.clone());
                }
            }
        }

        info!(
            "Reconciliation complete: {} confirmed, {} uploaded, {} already recorded, {} foreign, {} failed",
            report.already_on_remote.len(),
            report.uploaded.len(),
            report.already_recorded,
            report.foreign,
            report.failed.len()
        );
        Ok(report)
    }

    /// Probe-then-upload with a bounded retry loop. Between attempts the
    /// sync tool's server is torn down: a wedged server is the common
    /// transient failure and a restart is its documented cure.
    fn reconcile_item(
        &self,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<ItemOutcome, SyncError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_item(local_path, remote_path) {
                Ok(outcome) => return Ok(outcome),
                Err(err) if attempt < self.max_attempts => {
                    warn!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt, self.max_attempts, remote_path, err
                    );
                    if let Err(err) = self.runner.restart() {
                        warn!("Sync tool restart failed: {}", err);
                    }
                    std::thread::sleep(self.backoff);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn try_item(&self, local_path: &Path, remote_path: &str) -> Result<ItemOutcome, SyncError> {
        if self.runner.exists(remote_path)? {
            debug!("Remote path already present: {}", remote_path);
            return Ok(ItemOutcome::AlreadyOnRemote);
        }
        self.runner.upload(local_path, remote_path)?;
        Ok(ItemOutcome::Uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_import::{Importer, RunMode};
    use std::collections::HashMap;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Scripted remote: preloaded existing paths, per-path failure budgets,
    /// and a record of every upload and restart.
    #[derive(Default)]
    struct FakeRemote {
        existing: Mutex<BTreeSet<String>>,
        failures_left: Mutex<HashMap<String, usize>>,
        uploads: Mutex<Vec<String>>,
        restarts: Mutex<usize>,
    }

    impl FakeRemote {
        fn with_existing(self, paths: &[&str]) -> Self {
            {
                let mut existing = self.existing.lock().unwrap();
                existing.extend(paths.iter().map(|p| p.to_string()));
            }
            self
        }

        fn failing(self, remote_path: &str, failures: usize) -> Self {
            self.failures_left
                .lock()
                .unwrap()
                .insert(remote_path.to_string(), failures);
            self
        }
    }

    impl RemoteSync for FakeRemote {
        fn exists(&self, remote_path: &str) -> Result<bool, SyncError> {
            if let Some(left) = self.failures_left.lock().unwrap().get_mut(remote_path) {
                if *left > 0 {
                    *left -= 1;
                    return Err(SyncError::CommandFailed {
                        command: format!("fake-ls {remote_path}"),
                        code: 1,
                        output: "server wedged".into(),
                    });
                }
            }
            Ok(self.existing.lock().unwrap().contains(remote_path))
        }

        fn upload(&self, _local_path: &Path, remote_path: &str) -> Result<(), SyncError> {
            self.existing.lock().unwrap().insert(remote_path.to_string());
            self.uploads.lock().unwrap().push(remote_path.to_string());
            Ok(())
        }

        fn restart(&self) -> Result<(), SyncError> {
            *self.restarts.lock().unwrap() += 1;
            Ok(())
        }
    }

    /// Import `count` pictures into a fresh library root.
    fn seeded_root(temp: &TempDir, count: usize) -> PathBuf {
        let source = temp.path().join("incoming");
        fs::create_dir_all(&source).unwrap();
        for index in 0..count {
            File::create(source.join(format!("IMG_{index}.jpg")))
                .unwrap()
                .write_all(b"pic")
                .unwrap();
        }
        let root = temp.path().join("library");
        fs::create_dir_all(&root).unwrap();
        Importer::new(&source, &root, None, RunMode::Import)
            .process(false)
            .unwrap();
        root
    }

    fn remote_paths(root: &Path, remote_root: &str) -> Vec<String> {
        let remote = FakeRemote::default();
        let reconciler = SyncReconciler::new(&remote, root, remote_root);
        completed_imports(root)
            .unwrap()
            .paths
            .iter()
            .map(|p| reconciler.remote_path_for(p).unwrap())
            .collect()
    }

    #[test]
    fn uploads_everything_pending_and_persists_per_item() {
        let temp = TempDir::new().unwrap();
        let root = seeded_root(&temp, 3);
        let remote = FakeRemote::default();

        let reconciler = SyncReconciler::new(&remote, &root, "/backup/media")
            .with_retry(2, Duration::from_millis(1));
        let report = reconciler.sync().unwrap();

        assert_eq!(report.uploaded.len(), 3);
        assert!(report.failed.is_empty());

        let ledger = SyncLedger::load(&root).unwrap();
        assert_eq!(ledger.completed_uploads.len(), 3);
        assert!(ledger
            .completed_uploads
            .iter()
            .all(|p| p.starts_with("/backup/media/")));
    }

    #[test]
    fn mixed_run_reports_each_classification() {
        // 10 completed imports: 3 already in the ledger, 2 foreign, of the
        // remaining 5 one exhausts its retries. Expect 4 reconciled, 1
        // failed, and a ledger of exactly 3 + 4 entries.
        let temp = TempDir::new().unwrap();
        let root = seeded_root(&temp, 8);
        let paths = remote_paths(&root, "/backup/media");

        // Two foreign paths recorded by a manifest from another machine:
        // simulate by a manifest whose import paths are outside the root.
        let foreign_dir = temp.path().join("other_machine");
        fs::create_dir_all(&foreign_dir).unwrap();
        for name in ["f1.jpg", "f2.jpg"] {
            File::create(foreign_dir.join(name))
                .unwrap()
                .write_all(b"pic")
                .unwrap();
        }
        let manifest = root.join(".shoebox").join("import_19990101_000000_0_0.json");
        let foreign_json = serde_json::json!({
            "run_stamp": "19990101_000000",
            "source_directory": "/other/incoming",
            "source": {"type": "local", "path": "/other/incoming"},
            "media_import_root": foreign_dir,
            "library": null,
            "unimport": false,
            "imports": [
                {
                    "path": "/other/incoming/f1.jpg",
                    "file_name": "f1.jpg",
                    "capture": "20200101-000000",
                    "size_bytes": 3,
                    "kind": "PICTURE",
                    "archive_status": "PENDING",
                    "import_status": "COMPLETED",
                    "destination_path": null,
                    "import_path": foreign_dir.join("f1.jpg")
                },
                {
                    "path": "/other/incoming/f2.jpg",
                    "file_name": "f2.jpg",
                    "capture": "20200101-000000",
                    "size_bytes": 3,
                    "kind": "PICTURE",
                    "archive_status": "PENDING",
                    "import_status": "COMPLETED",
                    "destination_path": null,
                    "import_path": foreign_dir.join("f2.jpg")
                }
            ],
            "counters": {
                "total_imported": 2,
                "picture_imports": 2,
                "movie_imports": 0,
                "audio_imports": 0,
                "already_imported": 0,
                "not_imported": 0,
                "un_imported": 0
            }
        });
        fs::write(&manifest, serde_json::to_string_pretty(&foreign_json).unwrap()).unwrap();

        // Pre-record 3 of the 8 local paths in the ledger.
        let mut ledger = SyncLedger::load(&root).unwrap();
        for path in paths.iter().take(3) {
            ledger.record(path).unwrap();
        }

        // One of the remaining 5 fails more times than the retry budget.
        let victim = paths[3].clone();
        let remote = FakeRemote::default().failing(&victim, 10);

        let reconciler = SyncReconciler::new(&remote, &root, "/backup/media")
            .with_retry(3, Duration::from_millis(1));
        let report = reconciler.sync().unwrap();

        assert_eq!(report.already_recorded, 3);
        assert_eq!(report.foreign, 2);
        assert_eq!(report.reconciled(), 4);
        assert_eq!(report.failed.len(), 1);
        // Retry budget consumed: restart ran between attempts.
        assert_eq!(*remote.restarts.lock().unwrap(), 2);

        let ledger = SyncLedger::load(&root).unwrap();
        assert_eq!(ledger.completed_uploads.len(), 7);
    }

    #[test]
    fn transient_failures_recover_within_the_budget() {
        let temp = TempDir::new().unwrap();
        let root = seeded_root(&temp, 1);
        let victim = remote_paths(&root, "/backup/media")[0].clone();
        let remote = FakeRemote::default().failing(&victim, 2);

        let reconciler = SyncReconciler::new(&remote, &root, "/backup/media")
            .with_retry(4, Duration::from_millis(1));
        let report = reconciler.sync().unwrap();

        assert_eq!(report.uploaded.len(), 1);
        assert!(report.failed.is_empty());
        assert_eq!(*remote.restarts.lock().unwrap(), 2);
    }

    #[test]
    fn paths_already_on_the_remote_are_confirmed_without_upload() {
        let temp = TempDir::new().unwrap();
        let root = seeded_root(&temp, 2);
        let paths = remote_paths(&root, "/backup/media");
        let remote = FakeRemote::default().with_existing(&[paths[0].as_str()]);

        let reconciler = SyncReconciler::new(&remote, &root, "/backup/media")
            .with_retry(2, Duration::from_millis(1));
        let report = reconciler.sync().unwrap();

        assert_eq!(report.already_on_remote, vec![paths[0].clone()]);
        assert_eq!(report.uploaded, vec![paths[1].clone()]);
        assert_eq!(remote.uploads.lock().unwrap().len(), 1);
    }

    #[test]
    fn second_run_skips_everything_recorded() {
        let temp = TempDir::new().unwrap();
        let root = seeded_root(&temp, 2);
        let remote = FakeRemote::default();

        let reconciler = SyncReconciler::new(&remote, &root, "/backup/media")
            .with_retry(2, Duration::from_millis(1));
        reconciler.sync().unwrap();
        let second = reconciler.sync().unwrap();

        assert_eq!(second.already_recorded, 2);
        assert_eq!(second.reconciled(), 0);
        assert_eq!(remote.uploads.lock().unwrap().len(), 2);
    }
}
