//! Zip packing and unpacking, preserving modification times.
//!
//! Pack writes every file under a bundle directory into `{dir}.zip` with the
//! directory name as the top-level component, carrying each file's mtime into
//! the entry. Unpack restores entries (and their mtimes) under an output
//! directory, omitting entries whose file name matches a skip prefix.

use crate::error::ArchiveError;
use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Timelike};
use filetime::FileTime;
use shoebox_media::classify::SKIP_PREFIXES;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Entry options for a file, carrying its mtime when it fits the zip epoch.
fn entry_options(path: &Path) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);
    let Ok(metadata) = fs::metadata(path) else {
        return options;
    };
    let Ok(modified) = metadata.modified() else {
        return options;
    };
    let local: DateTime<Local> = modified.into();
    match zip::DateTime::from_date_and_time(
        local.year().clamp(0, u16::MAX as i32) as u16,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    ) {
        Ok(stamp) => options.last_modified_time(stamp),
        // Pre-1980 mtimes cannot be represented; entry keeps the default.
        Err(_) => options,
    }
}

/// Pack `dir` into a sibling `{dir}.zip`, returning the zip path.
pub fn pack_dir(dir: &Path) -> Result<PathBuf, ArchiveError> {
    let zip_path = dir.with_extension("zip");
    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let pack_err = |reason: String| ArchiveError::Pack {
        dir: dir.to_path_buf(),
        zip: zip_path.clone(),
        reason,
    };

    info!("Packing {} into {}", dir.display(), zip_path.display());
    let file = File::create(&zip_path).map_err(|e| pack_err(e.to_string()))?;
    let mut writer = ZipWriter::new(file);

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| pack_err(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| pack_err(e.to_string()))?;
        let entry_name = format!(
            "{}/{}",
            dir_name,
            rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/")
        );
        debug!("Adding entry: {}", entry_name);
        writer
            .start_file(entry_name.as_str(), entry_options(entry.path()))
            .map_err(|e| pack_err(e.to_string()))?;
        let mut source = File::open(entry.path()).map_err(|e| pack_err(e.to_string()))?;
        io::copy(&mut source, &mut writer).map_err(|e| pack_err(e.to_string()))?;
    }

    writer.finish().map_err(|e| pack_err(e.to_string()))?;
    info!("Created archive zip: {}", zip_path.display());
    Ok(zip_path)
}

/// Unix timestamp for a zip entry stamp, interpreted in local time.
fn entry_mtime(stamp: zip::DateTime) -> Option<FileTime> {
    let naive = NaiveDate::from_ymd_opt(
        stamp.year() as i32,
        stamp.month() as u32,
        stamp.day() as u32,
    )?
    .and_hms_opt(
        stamp.hour() as u32,
        stamp.minute() as u32,
        stamp.second() as u32,
    )?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    Some(FileTime::from_unix_time(local.timestamp(), 0))
}

/// Whether an entry's file-name component matches a skip prefix.
fn skip_entry(entry_name: &str) -> bool {
    let file_name = entry_name.rsplit('/').next().unwrap_or(entry_name);
    SKIP_PREFIXES.iter().any(|p| file_name.starts_with(p))
}

/// Extract `zip_path` under `output_dir`, returning the extracted bundle
/// directory (named after the zip stem).
///
/// Entries with a skip-prefixed file name are omitted. A corrupt entry is
/// logged and skipped so the rest of the archive still lands on disk, but
/// the call fails at the end so the caller never mistakes a partial extract
/// for a complete one.
pub fn unpack_archive(zip_path: &Path, output_dir: &Path) -> Result<PathBuf, ArchiveError> {
    let unpack_err = |reason: String| ArchiveError::Unpack {
        zip: zip_path.to_path_buf(),
        reason,
    };
    let stem = zip_path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| unpack_err("zip path has no file name".to_string()))?;
    let extracted_dir = output_dir.join(&stem);
    fs::create_dir_all(&extracted_dir)?;

    info!("Extracting {} to {}", zip_path.display(), extracted_dir.display());
    let file = File::open(zip_path).map_err(|e| unpack_err(e.to_string()))?;
    let mut archive = ZipArchive::new(file).map_err(|e| unpack_err(e.to_string()))?;

    let mut corrupt = 0usize;
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Corrupt entry #{index} in {}: {}", zip_path.display(), err);
                corrupt += 1;
                continue;
            }
        };
        let Some(rel) = entry.enclosed_name() else {
            warn!("Skipping entry with unsafe path: {}", entry.name());
            continue;
        };
        if skip_entry(entry.name()) {
            debug!("Skipping entry with a skip-able prefix: {}", entry.name());
            continue;
        }
        let dest = output_dir.join(&rel);
        if entry.is_dir() {
            fs::create_dir_all(&dest)?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mtime = entry.last_modified().and_then(entry_mtime);
        let mut out = match File::create(&dest) {
            Ok(out) => out,
            Err(err) => {
                warn!("Cannot create {}: {}", dest.display(), err);
                corrupt += 1;
                continue;
            }
        };
        if let Err(err) = io::copy(&mut entry, &mut out) {
            warn!("Failed extracting {}: {}", dest.display(), err);
            corrupt += 1;
            continue;
        }
        drop(out);
        if let Some(mtime) = mtime {
            if let Err(err) = filetime::set_file_mtime(&dest, mtime) {
                warn!("Cannot restore mtime on {}: {}", dest.display(), err);
            }
        }
        debug!("Extracted: {}", dest.display());
    }

    if corrupt > 0 {
        return Err(ArchiveError::CorruptEntries {
            zip: zip_path.to_path_buf(),
            count: corrupt,
        });
    }
    info!("Completed extraction to: {}", extracted_dir.display());
    Ok(extracted_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn make_bundle_dir(root: &Path) -> PathBuf {
        let bundle = root.join("20200101-20200131_maple");
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join("IMG_0001.jpg"), b"picture bytes").unwrap();
        fs::write(bundle.join("clip.mp4"), b"movie bytes").unwrap();
        fs::write(bundle.join("._IMG_0001.jpg"), b"appledouble").unwrap();
        bundle
    }

    #[test]
    fn pack_then_unpack_round_trips_content() {
        let temp = TempDir::new().unwrap();
        let bundle = make_bundle_dir(temp.path());
        filetime::set_file_mtime(
            bundle.join("IMG_0001.jpg"),
            FileTime::from_unix_time(1_577_836_800, 0), // 2020-01-01T00:00:00Z
        )
        .unwrap();

        let zip_path = pack_dir(&bundle).unwrap();
        assert!(zip_path.ends_with("20200101-20200131_maple.zip"));

        let out = temp.path().join("out");
        let extracted = unpack_archive(&zip_path, &out).unwrap();
        assert_eq!(extracted, out.join("20200101-20200131_maple"));
        assert_eq!(
            fs::read(extracted.join("IMG_0001.jpg")).unwrap(),
            b"picture bytes"
        );
        assert_eq!(fs::read(extracted.join("clip.mp4")).unwrap(), b"movie bytes");
    }

    #[test]
    fn unpack_omits_skip_prefixed_entries() {
        let temp = TempDir::new().unwrap();
        let bundle = make_bundle_dir(temp.path());
        let zip_path = pack_dir(&bundle).unwrap();

        let out = temp.path().join("out");
        let extracted = unpack_archive(&zip_path, &out).unwrap();
        assert!(!extracted.join("._IMG_0001.jpg").exists());
    }

    #[test]
    fn unpack_restores_mtimes_within_zip_resolution() {
        let temp = TempDir::new().unwrap();
        let bundle = make_bundle_dir(temp.path());
        let original = FileTime::from_unix_time(1_577_840_461, 0);
        filetime::set_file_mtime(bundle.join("IMG_0001.jpg"), original).unwrap();

        let zip_path = pack_dir(&bundle).unwrap();
        let out = temp.path().join("out");
        let extracted = unpack_archive(&zip_path, &out).unwrap();

        let restored = fs::metadata(extracted.join("IMG_0001.jpg"))
            .unwrap()
            .modified()
            .unwrap();
        let restored = FileTime::from_system_time(restored);
        // Zip timestamps have 2-second resolution.
        assert!((restored.unix_seconds() - original.unix_seconds()).abs() <= 2);
    }

    #[test]
    fn unpack_rejects_a_non_zip() {
        let temp = TempDir::new().unwrap();
        let bogus = temp.path().join("not_really.zip");
        File::create(&bogus).unwrap().write_all(b"nope").unwrap();
        let err = unpack_archive(&bogus, temp.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::Unpack { .. }));
    }
}
