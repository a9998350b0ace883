//! Well-known directories and ledger file locations.
//!
//! Nothing here is created implicitly; [`Directories::ensure`] builds the
//! inbox tree on demand, and every path can be overridden by the caller.

use crate::error::MediaError;
use crate::types::MediaKind;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the metadata directory kept under a media import root.
pub const METADATA_DIR_NAME: &str = ".shoebox";

/// Flat-file ledger names kept under the inbox.
pub const COMPLETED_IMPORTS_FILE: &str = "completed_imports.txt";
pub const FAILED_IMPORTS_FILE: &str = "failed_imports.txt";
pub const REARCHIVE_FILE: &str = "rearchive.txt";
pub const REARCHIVE_COMPLETE_FILE: &str = "rearchive_complete.txt";
pub const REARCHIVE_FAILED_FILE: &str = "rearchive_failed.txt";

/// Destination subtree name for a media kind, or `None` for kinds that are
/// never imported. Movies land under `Videos` on Windows, matching platform
/// convention.
pub fn kind_dir_name(kind: MediaKind) -> Option<&'static str> {
    match kind {
        MediaKind::Picture => Some("Pictures"),
        MediaKind::Movie => {
            if cfg!(windows) {
                Some("Videos")
            } else {
                Some("Movies")
            }
        }
        MediaKind::Audio => Some("Music"),
        MediaKind::Unknown => None,
    }
}

/// Resolved filesystem layout for one machine.
#[derive(Debug, Clone)]
pub struct Directories {
    /// Root under which imported media lives by default (home directory
    /// unless overridden).
    pub media_root: PathBuf,
    /// Staging area for archive creation and remote imports.
    pub media_inbox: PathBuf,
    /// Where remote archives are downloaded and unpacked before importing.
    pub auto_import_dir: PathBuf,
    /// Where archive bundles are staged, closed and packed.
    pub archive_files_dir: PathBuf,
}

impl Directories {
    /// Resolve the layout. `media_root` defaults to the home directory;
    /// `media_inbox` defaults to `Desktop/Media_Inbox` when a Desktop
    /// exists, else `Media_Inbox` under the media root.
    pub fn resolve(
        media_root: Option<PathBuf>,
        media_inbox: Option<PathBuf>,
    ) -> Result<Self, MediaError> {
        let media_root = match media_root {
            Some(root) => root,
            None => dirs::home_dir().ok_or(MediaError::NoHomeDirectory)?,
        };
        let media_inbox = match media_inbox {
            Some(inbox) => inbox,
            None => {
                let desktop = media_root.join("Desktop");
                if desktop.is_dir() {
                    desktop.join("Media_Inbox")
                } else {
                    media_root.join("Media_Inbox")
                }
            }
        };
        let auto_import_dir = media_inbox.join("auto_import");
        let archive_files_dir = media_inbox.join("archive_files");
        Ok(Self {
            media_root,
            media_inbox,
            auto_import_dir,
            archive_files_dir,
        })
    }

    /// Create the inbox tree if any part of it is missing.
    pub fn ensure(&self) -> Result<(), MediaError> {
        fs::create_dir_all(&self.auto_import_dir)?;
        fs::create_dir_all(&self.archive_files_dir)?;
        Ok(())
    }

    pub fn completed_imports_file(&self) -> PathBuf {
        self.auto_import_dir.join(COMPLETED_IMPORTS_FILE)
    }

    pub fn failed_imports_file(&self) -> PathBuf {
        self.auto_import_dir.join(FAILED_IMPORTS_FILE)
    }

    pub fn rearchive_file(&self) -> PathBuf {
        self.archive_files_dir.join(REARCHIVE_FILE)
    }

    pub fn rearchive_complete_file(&self) -> PathBuf {
        self.archive_files_dir.join(REARCHIVE_COMPLETE_FILE)
    }

    pub fn rearchive_failed_file(&self) -> PathBuf {
        self.archive_files_dir.join(REARCHIVE_FAILED_FILE)
    }
}

/// Metadata directory under an import root, where run manifests and the
/// remote-sync ledger live.
pub fn metadata_dir(import_root: &Path) -> PathBuf {
    import_root.join(METADATA_DIR_NAME)
}
