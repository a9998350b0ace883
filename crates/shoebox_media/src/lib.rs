//! Domain types, classification and scanning for shoebox.
//!
//! This crate is the leaf of the workspace: it knows what a media file is
//! (kind, capture time, lifecycle status), how to classify one from its name,
//! how to enumerate a source tree into a time-sorted manifest, and where the
//! well-known directories and ledger files live on a machine.

pub mod classify;
pub mod directories;
pub mod error;
pub mod scanner;
pub mod types;

pub use classify::{classify, should_skip};
pub use directories::Directories;
pub use error::MediaError;
pub use scanner::{scan, Scan, ScanSummary};
pub use types::{ArchiveStatus, ImportStatus, MediaKind, MediaRecord};
