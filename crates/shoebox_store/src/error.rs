//! Error types for the object-store boundary.

use thiserror::Error;

/// Object-store errors. Backend failures are carried as rendered strings:
/// the SDK's error types are deeply generic and nothing upstream dispatches
/// on them beyond "transient remote failure".
#[derive(Error, Debug)]
pub enum StoreError {
    /// Bucket missing or not accessible with the current credentials.
    #[error("Bucket not accessible: {bucket}: {reason}")]
    Bucket { bucket: String, reason: String },

    /// The requested key does not exist.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The backend rejected or failed a request.
    #[error("Object store request failed for {key}: {reason}")]
    Backend { key: String, reason: String },

    /// IO error (local file staging)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
