//! Error types for archiving.

use shoebox_media::MediaError;
use shoebox_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Archive errors. Everything here is fatal to the current run; bundles
/// already closed stay on disk.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Scanning the source tree failed.
    #[error("Scan failed: {0}")]
    Scan(#[from] MediaError),

    /// Not enough free space at the staging root to archive safely.
    #[error(
        "Insufficient disk space at {dir}: {needed} bytes needed (3x manifest), {available} available"
    )]
    DiskSpace {
        dir: PathBuf,
        needed: u64,
        available: u64,
    },

    /// A bundle close fired before any member was added. Indicates broken
    /// configuration or input, never a normal run.
    #[error("Cannot close a bundle before any file was added to it")]
    EmptyBundle,

    /// Moving a file into its staging directory failed.
    #[error("Failed to move {file} into {dest}")]
    Move {
        file: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Renaming a staging directory to its final bundle name failed.
    #[error("Failed to rename bundle directory to {dest}")]
    Rename {
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Creating the zip for a bundle failed.
    #[error("Failed to pack {dir} into {zip}: {reason}")]
    Pack {
        dir: PathBuf,
        zip: PathBuf,
        reason: String,
    },

    /// An archive had entries that could not be extracted.
    #[error("Detected {count} corrupt entries while unpacking {zip}")]
    CorruptEntries { zip: PathBuf, count: usize },

    /// Unpacking an archive failed outright.
    #[error("Failed to unpack {zip}: {reason}")]
    Unpack { zip: PathBuf, reason: String },

    /// Uploading a packed bundle failed. Archiving is complete only once
    /// artifacts are durably off-box when an upload was requested.
    #[error("Failed to upload {key}")]
    Upload {
        key: String,
        #[source]
        source: StoreError,
    },

    /// A provenance file was present but missing a required field.
    #[error("Provenance file missing field: {0}")]
    ProvenanceMissingField(&'static str),

    /// A provenance file was expected and not found.
    #[error("No provenance file in {0}")]
    ProvenanceNotFound(PathBuf),

    /// IO error (staging, provenance writes)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
