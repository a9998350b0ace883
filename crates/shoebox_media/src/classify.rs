//! File classification and skip rules.
//!
//! Classification is a pure, case-insensitive extension lookup against three
//! fixed extension sets. Skip rules come in three independent classes: exact
//! file names, name prefixes, and extensions. Symbolic links are always
//! skipped, but that is enforced by the scanner (a name alone cannot tell).

use crate::types::MediaKind;

/// Extensions classified as pictures. Lookup is case-insensitive.
pub const PICTURE_EXTENSIONS: &[&str] = &[
    "aae", "bmp", "gif", "heic", "jpg", "jpeg", "png", "tif", "tiff",
];

/// Extensions classified as movies.
pub const MOVIE_EXTENSIONS: &[&str] = &["avi", "3gp", "mov", "m4v", "mp4", "mpg", "wmv"];

/// Extensions classified as audio.
pub const AUDIO_EXTENSIONS: &[&str] = &["aac", "flac", "m4a", "m4p", "mp3", "wav", "webm", "wma"];

/// File names never picked up by a scan.
pub const SKIP_NAMES: &[&str] = &[".DS_Store"];

/// Name prefixes never picked up by a scan (AppleDouble droppings, editor
/// swap files). Also applied to archive entries during unpack.
pub const SKIP_PREFIXES: &[&str] = &["._", "~"];

/// Extensions never picked up by a scan. Packed bundles living next to
/// loose media must not be re-archived into another bundle.
pub const SKIP_EXTENSIONS: &[&str] = &["zip"];

/// Classify a file name by its extension.
pub fn classify(file_name: &str) -> MediaKind {
    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return MediaKind::Unknown,
    };
    if PICTURE_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Picture
    } else if MOVIE_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Movie
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Audio
    } else {
        MediaKind::Unknown
    }
}

/// Whether a file name matches any skip rule.
pub fn should_skip(file_name: &str) -> bool {
    if SKIP_NAMES.contains(&file_name) {
        return true;
    }
    if SKIP_PREFIXES.iter().any(|p| file_name.starts_with(p)) {
        return true;
    }
    SKIP_EXTENSIONS
        .iter()
        .any(|ext| file_name.to_ascii_lowercase().ends_with(&format!(".{ext}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_pictures_case_insensitively() {
        assert_eq!(classify("IMG_0001.JPG"), MediaKind::Picture);
        assert_eq!(classify("IMG_0001.jpg"), MediaKind::Picture);
        assert_eq!(classify("img.HEIC"), MediaKind::Picture);
    }

    #[test]
    fn classifies_movies_and_audio() {
        assert_eq!(classify("clip.MOV"), MediaKind::Movie);
        assert_eq!(classify("clip.mp4"), MediaKind::Movie);
        assert_eq!(classify("track.flac"), MediaKind::Audio);
    }

    #[test]
    fn unrecognized_extensions_are_unknown() {
        assert_eq!(classify("notes.txt"), MediaKind::Unknown);
        assert_eq!(classify("no_extension"), MediaKind::Unknown);
    }

    #[test]
    fn skip_rules_match_independently() {
        // Exact name
        assert!(should_skip(".DS_Store"));
        // Prefixes, regardless of extension
        assert!(should_skip("._IMG_0001.jpg"));
        assert!(should_skip("~scratch.mov"));
        // Extension
        assert!(should_skip("20190113-20200103_colin.zip"));
        assert!(should_skip("UPPER.ZIP"));
    }

    #[test]
    fn media_names_are_not_skipped() {
        assert!(!should_skip("IMG_0001.jpg"));
        assert!(!should_skip("clip.mp4"));
        assert!(!should_skip("track.flac"));
    }
}
