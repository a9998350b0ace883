//! Import/unimport state machine, run ledgers and batch store imports.
//!
//! An import run copies classified media into a date-partitioned library
//! tree, one file at a time, persisting a JSON run manifest after every file
//! so a crash costs at most one file's bookkeeping. Idempotency rests on
//! destination-path existence on disk; the flat key ledgers are advisory
//! caches layered on top.

pub mod error;
pub mod importer;
pub mod ledger;
pub mod reader;
pub mod rearchive;
pub mod remote;

pub use error::ImportError;
pub use importer::{Importer, RunMode};
pub use ledger::{ImportCounters, ImportLedger, KeyFile, SourceIdentity};
pub use reader::{completed_imports, CompletedImports};
pub use rearchive::ReArchiver;
pub use remote::{BatchSummary, StoreImporter};
