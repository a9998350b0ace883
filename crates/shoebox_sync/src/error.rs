//! Error types for remote sync.

use shoebox_import::ImportError;
use std::path::PathBuf;
use thiserror::Error;

/// Remote-sync errors. Per-item transport failures are retried with a
/// process-restart recovery action before they surface here.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Reading the completed-imports view failed.
    #[error(transparent)]
    Imports(#[from] ImportError),

    /// The sync tool could not be started at all.
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The sync tool exited with an unexpected code.
    #[error("Command '{command}' exited with code {code}:\n{output}")]
    CommandFailed {
        command: String,
        code: i32,
        output: String,
    },

    /// Persisting or parsing the remote-sync ledger failed.
    #[error("Sync ledger error at {path}: {reason}")]
    Ledger { path: PathBuf, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
