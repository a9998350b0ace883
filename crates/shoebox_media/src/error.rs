//! Error types for the media domain layer.

use std::path::PathBuf;
use thiserror::Error;

/// Media layer errors.
#[derive(Error, Debug)]
pub enum MediaError {
    /// The scan root is missing or not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// No home directory could be determined for path defaulting.
    #[error("Could not determine a home directory")]
    NoHomeDirectory,

    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
