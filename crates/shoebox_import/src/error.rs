//! Error types for importing.

use shoebox_archive::ArchiveError;
use shoebox_media::MediaError;
use shoebox_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Import errors. Per-file copy failures are fatal to their run; per-key
/// failures in a batch are isolated by the caller.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Scanning or directory resolution in the media layer failed.
    #[error(transparent)]
    Media(#[from] MediaError),

    /// The media import root is missing.
    #[error("Media import root not found: {0}")]
    RootNotFound(PathBuf),

    /// Copying a file into the library failed.
    #[error("Failed to import {file} to {dest}")]
    Copy {
        file: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Deleting a previously imported file failed.
    #[error("Failed to un-import {file}")]
    Delete {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisting or parsing a run manifest failed.
    #[error("Run manifest error at {path}: {reason}")]
    Ledger { path: PathBuf, reason: String },

    /// Object-store interaction failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Packing/unpacking or re-archiving failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// IO error (ledger files, directory creation, cleanup)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
