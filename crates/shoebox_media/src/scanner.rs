//! Source tree scanning.
//!
//! A scan walks a directory tree, applies the skip rules, classifies every
//! regular file and produces a manifest sorted ascending by capture time.
//! Scanning is read-only; nothing is moved, copied or deleted here.

use crate::classify::{classify, should_skip};
use crate::error::MediaError;
use crate::types::{MediaKind, MediaRecord};
use chrono::{DateTime, Local};
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Aggregate facts about one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    pub file_count: usize,
    pub picture_count: usize,
    pub movie_count: usize,
    pub audio_count: usize,
    pub unknown_count: usize,
    pub skipped_count: usize,
    pub total_size_bytes: u64,
    pub earliest: Option<DateTime<Local>>,
    pub latest: Option<DateTime<Local>>,
}

/// A time-sorted manifest plus its summary.
#[derive(Debug, Clone)]
pub struct Scan {
    pub records: Vec<MediaRecord>,
    pub summary: ScanSummary,
}

/// Best-effort capture time: native creation time where the platform keeps
/// one that survives archive round-trips (Windows, macOS — where setting an
/// older mtime pulls the birth time back with it), else last content
/// modification, else the epoch. A known accuracy limitation, deliberately
/// not "fixed": extraction-fresh birth times on other platforms would make
/// every unpacked file look like it was captured today.
#[cfg(any(windows, target_os = "macos"))]
fn capture_time(metadata: &Metadata) -> DateTime<Local> {
    let time = metadata
        .created()
        .or_else(|_| metadata.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH);
    DateTime::<Local>::from(time)
}

#[cfg(not(any(windows, target_os = "macos")))]
fn capture_time(metadata: &Metadata) -> DateTime<Local> {
    let time = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    DateTime::<Local>::from(time)
}

/// Recursively enumerate `root` into a manifest sorted by capture time.
///
/// Symbolic links are skipped unconditionally; files matching a skip rule
/// are counted but produce no record. Fails with
/// [`MediaError::NotADirectory`] when `root` is missing or not a directory.
pub fn scan(root: &Path) -> Result<Scan, MediaError> {
    if !root.is_dir() {
        return Err(MediaError::NotADirectory(root.to_path_buf()));
    }
    info!("Scanning directory: {}", root.display());

    let mut records = Vec::new();
    let mut summary = ScanSummary::default();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), err);
                continue;
            }
        };
        if entry.path_is_symlink() {
            debug!("Skipping symlink: {}", entry.path().display());
            summary.skipped_count += 1;
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if should_skip(&file_name) {
            debug!("Skipping by rule: {}", entry.path().display());
            summary.skipped_count += 1;
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("Skipping unreadable file {}: {}", entry.path().display(), err);
                summary.skipped_count += 1;
                continue;
            }
        };
        let kind = classify(&file_name);
        let capture = capture_time(&metadata);
        let record = MediaRecord::new(entry.path(), capture, metadata.len(), kind);

        summary.file_count += 1;
        summary.total_size_bytes += record.size_bytes;
        match kind {
            MediaKind::Picture => summary.picture_count += 1,
            MediaKind::Movie => summary.movie_count += 1,
            MediaKind::Audio => summary.audio_count += 1,
            MediaKind::Unknown => summary.unknown_count += 1,
        }
        summary.earliest = Some(match summary.earliest {
            Some(earliest) => earliest.min(capture),
            None => capture,
        });
        summary.latest = Some(match summary.latest {
            Some(latest) => latest.max(capture),
            None => capture,
        });
        records.push(record);
    }

    records.sort_by_key(|record| record.capture);

    info!(
        "Found {} files ({} pictures, {} movies, {} audio, {} unknown), {} bytes total",
        summary.file_count,
        summary.picture_count,
        summary.movie_count,
        summary.audio_count,
        summary.unknown_count,
        summary.total_size_bytes
    );
    Ok(Scan { records, summary })
}
