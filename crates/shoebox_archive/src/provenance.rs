//! Per-bundle provenance files.
//!
//! Every closed bundle directory carries a small `Key: value` text file
//! recording how and when it was created. The importer skips it as metadata
//! and uses its `Library` line to route files when the caller did not pin a
//! library explicitly.

use crate::error::ArchiveError;
use chrono::Local;
use shoebox_media::types::COMPACT_STAMP;
use std::fs;
use std::path::Path;
use tracing::debug;

/// File name written into every closed bundle directory.
pub const PROVENANCE_FILE_NAME: &str = "shoebox_info.txt";

/// Library name used when none was specified.
pub const DEFAULT_LIBRARY: &str = "default";

/// Metadata recorded alongside archived media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Tool version that produced the bundle.
    pub version: String,
    /// Creation stamp, compact format.
    pub created: String,
    /// Source directory the media came from.
    pub source: String,
    /// Identity word of the bundle set.
    pub keyword: String,
    /// Library subdivision, `default` when unset.
    pub library: String,
}

impl Provenance {
    pub fn new(source: &Path, keyword: &str, library: Option<&str>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            created: Local::now().format(COMPACT_STAMP).to_string(),
            source: source.display().to_string(),
            keyword: keyword.to_string(),
            library: library.unwrap_or(DEFAULT_LIBRARY).to_string(),
        }
    }
}

/// Write the provenance file into `bundle_dir`.
pub fn write_provenance(bundle_dir: &Path, provenance: &Provenance) -> Result<(), ArchiveError> {
    let contents = format!(
        "Version: {}\nCreated: {}\nSource: {}\nKeyword: {}\nLibrary: {}\n",
        provenance.version,
        provenance.created,
        provenance.source,
        provenance.keyword,
        provenance.library
    );
    let path = bundle_dir.join(PROVENANCE_FILE_NAME);
    fs::write(&path, contents)?;
    debug!("Wrote provenance: {}", path.display());
    Ok(())
}

/// Read the provenance file from `dir`, failing with a structured error
/// naming any missing required field.
pub fn read_provenance(dir: &Path) -> Result<Provenance, ArchiveError> {
    let path = dir.join(PROVENANCE_FILE_NAME);
    if !path.is_file() {
        return Err(ArchiveError::ProvenanceNotFound(dir.to_path_buf()));
    }
    let contents = fs::read_to_string(&path)?;

    let mut version = None;
    let mut created = None;
    let mut source = None;
    let mut keyword = None;
    let mut library = None;
    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "Version" => version = Some(value),
            "Created" => created = Some(value),
            "Source" => source = Some(value),
            "Keyword" => keyword = Some(value),
            "Library" => library = Some(value),
            _ => {}
        }
    }

    Ok(Provenance {
        version: version.ok_or(ArchiveError::ProvenanceMissingField("Version"))?,
        created: created.ok_or(ArchiveError::ProvenanceMissingField("Created"))?,
        source: source.ok_or(ArchiveError::ProvenanceMissingField("Source"))?,
        keyword: keyword.ok_or(ArchiveError::ProvenanceMissingField("Keyword"))?,
        library: library.unwrap_or_else(|| DEFAULT_LIBRARY.to_string()),
    })
}
