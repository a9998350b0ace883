//! Core lifecycle types for media files.
//!
//! A [`MediaRecord`] is a transient in-memory projection of filesystem state.
//! The durable record of what happened to a file is the persisted run
//! manifest; destination-path existence on disk is always the authoritative
//! idempotency check.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Compact timestamp format used in manifests and bundle names.
pub const COMPACT_STAMP: &str = "%Y%m%d-%H%M%S";

/// Prefix format applied to imported file names.
pub const IMPORT_PREFIX_STAMP: &str = "%Y-%m-%d_%H%M%S_";

/// Media classification derived from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaKind {
    Picture,
    Movie,
    Audio,
    Unknown,
}

/// Whether a file has been moved into an archive bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArchiveStatus {
    Pending,
    Completed,
}

/// Outcome of running a file through the import state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    Pending,
    Completed,
    AlreadyExists,
    DoNotImport,
    Unimported,
}

/// One discovered media file and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Absolute path of the file at its source location.
    pub path: PathBuf,
    /// File name component of `path`.
    pub file_name: String,
    /// Best-effort capture time: native creation time where the platform
    /// exposes one, otherwise last content modification. A known accuracy
    /// limitation, not a bug.
    #[serde(with = "stamp_serde")]
    pub capture: DateTime<Local>,
    /// Size in bytes at scan time.
    pub size_bytes: u64,
    pub kind: MediaKind,
    pub archive_status: ArchiveStatus,
    pub import_status: ImportStatus,
    /// Where the file landed after an archive move, if any.
    pub destination_path: Option<PathBuf>,
    /// Where the file landed after an import copy, if any.
    pub import_path: Option<PathBuf>,
}

impl MediaRecord {
    pub fn new(path: &Path, capture: DateTime<Local>, size_bytes: u64, kind: MediaKind) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            file_name,
            capture,
            size_bytes,
            kind,
            archive_status: ArchiveStatus::Pending,
            import_status: ImportStatus::Pending,
            destination_path: None,
            import_path: None,
        }
    }

    /// Capture time as the compact `yyyymmdd-HHMMSS` stamp.
    pub fn compact_stamp(&self) -> String {
        self.capture.format(COMPACT_STAMP).to_string()
    }

    /// The capture-time prefix an imported copy of this file carries.
    pub fn import_prefix(&self) -> String {
        self.capture.format(IMPORT_PREFIX_STAMP).to_string()
    }

    /// File name with the capture-time prefix, unless the name already
    /// carries that exact prefix (prevents prefix accumulation on re-runs).
    pub fn prefixed_name(&self) -> String {
        let prefix = self.import_prefix();
        if self.file_name.starts_with(&prefix) {
            self.file_name.clone()
        } else {
            format!("{}{}", prefix, self.file_name)
        }
    }
}

/// Serialize capture timestamps as compact stamps so run manifests stay
/// greppable and stable across timezone databases.
mod stamp_serde {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
    use serde::{self, Deserialize, Deserializer, Serializer};

    use super::COMPACT_STAMP;

    pub fn serialize<S>(value: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(COMPACT_STAMP).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let naive = NaiveDateTime::parse_from_str(&raw, COMPACT_STAMP)
            .map_err(serde::de::Error::custom)?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| serde::de::Error::custom(format!("Ambiguous local time: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_at(name: &str, y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> MediaRecord {
        let capture = Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap();
        MediaRecord::new(Path::new(name), capture, 100, MediaKind::Picture)
    }

    #[test]
    fn prefixed_name_adds_capture_prefix() {
        let record = record_at("/media/IMG_7941.HEIC", 2022, 4, 17, 18, 48, 5);
        assert_eq!(record.prefixed_name(), "2022-04-17_184805_IMG_7941.HEIC");
    }

    #[test]
    fn prefixed_name_does_not_accumulate() {
        let record = record_at("/media/2022-04-17_184805_IMG_7941.HEIC", 2022, 4, 17, 18, 48, 5);
        assert_eq!(record.prefixed_name(), "2022-04-17_184805_IMG_7941.HEIC");
    }

    #[test]
    fn prefixed_name_differs_for_other_capture_times() {
        // A stale prefix from a different capture time is kept and a fresh
        // one is prepended; only the exact current prefix is recognized.
        let record = record_at("/media/2021-01-01_000000_IMG.jpg", 2022, 4, 17, 18, 48, 5);
        assert_eq!(
            record.prefixed_name(),
            "2022-04-17_184805_2021-01-01_000000_IMG.jpg"
        );
    }

    #[test]
    fn capture_stamp_round_trips_through_json() {
        let record = record_at("/media/clip.mov", 2020, 12, 31, 23, 59, 58);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("20201231-235958"));
        let back: MediaRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.capture, record.capture);
    }

    #[test]
    fn statuses_serialize_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ImportStatus::AlreadyExists).unwrap(),
            "\"ALREADY_EXISTS\""
        );
        assert_eq!(
            serde_json::to_string(&ImportStatus::DoNotImport).unwrap(),
            "\"DO_NOT_IMPORT\""
        );
        assert_eq!(serde_json::to_string(&MediaKind::Picture).unwrap(), "\"PICTURE\"");
    }
}
