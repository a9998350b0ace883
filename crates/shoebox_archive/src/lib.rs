//! Size-bounded bundling, packing and provenance.
//!
//! An archive run takes a scattered source tree and turns it into dated,
//! size-bounded bundle directories, each packed into a zip and optionally
//! uploaded to an object store. Planning (which records land in which
//! bundle) is a pure function; execution moves files and is fatal on the
//! first failure so an interrupted run is never resumed blindly.

pub mod archiver;
pub mod codec;
pub mod error;
pub mod provenance;
pub mod words;

pub use archiver::{plan_bundles, ArchiveOutcome, Archiver, BundlePlan, MAX_BUNDLE_BYTES};
pub use codec::{pack_dir, unpack_archive};
pub use error::ArchiveError;
pub use provenance::{read_provenance, write_provenance, Provenance, PROVENANCE_FILE_NAME};
