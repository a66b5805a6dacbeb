//! Object key and staging path derivation.
//!
//! Keys are hierarchical strings. The processed artifact lives under a fixed
//! `processed/` namespace; the full original key is kept beneath the prefix
//! so the derivation stays injective for nested keys (two inputs can never
//! collide on the same output object).

use std::path::{Path, PathBuf};

use crate::error::{StorageError, StorageResult};

/// Namespace prefix for published anonymized artifacts.
pub const PROCESSED_PREFIX: &str = "processed";

/// Derive the output artifact key from the original object key.
///
/// `clip.mp4` becomes `processed/clip.mp4`; nested keys keep their full
/// path (`a/b/clip.mp4` becomes `processed/a/b/clip.mp4`).
pub fn processed_object_key(original_key: &str) -> String {
    format!("{}/{}", PROCESSED_PREFIX, original_key)
}

/// Local path a source object is downloaded to before processing.
pub fn download_path(work_dir: impl AsRef<Path>, key: &str) -> PathBuf {
    work_dir.as_ref().join("downloads").join(key)
}

/// Local path the transformed output is written to before publishing.
pub fn output_path(work_dir: impl AsRef<Path>, key: &str) -> PathBuf {
    work_dir.as_ref().join("outputs").join(key)
}

/// Guess a content type from the key's extension.
pub fn guess_content_type(key: &str) -> &'static str {
    let lower = key.to_lowercase();
    if lower.ends_with(".mp4") || lower.ends_with(".m4v") {
        "video/mp4"
    } else if lower.ends_with(".mov") {
        "video/quicktime"
    } else if lower.ends_with(".webm") {
        "video/webm"
    } else if lower.ends_with(".mkv") {
        "video/x-matroska"
    } else {
        "application/octet-stream"
    }
}

/// Validate an object key before using it for store or filesystem paths.
///
/// Rejects empty keys, absolute paths, and `..` components; a hostile key
/// must not be able to escape the staging directory.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_key("empty key"));
    }
    if key.starts_with('/') {
        return Err(StorageError::invalid_key(format!(
            "absolute path not allowed: {}",
            key
        )));
    }
    if key.split('/').any(|component| component == "..") {
        return Err(StorageError::invalid_key(format!(
            "parent traversal not allowed: {}",
            key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_processed_key() {
        assert_eq!(processed_object_key("clip.mp4"), "processed/clip.mp4");
        assert_eq!(
            processed_object_key("user1/raw/clip.mp4"),
            "processed/user1/raw/clip.mp4"
        );
    }

    #[test]
    fn processed_key_is_injective_for_nested_keys() {
        let a = processed_object_key("user1/clip.mp4");
        let b = processed_object_key("user2/clip.mp4");
        assert_ne!(a, b);
    }

    #[test]
    fn staging_paths_are_injective_in_key() {
        let work = Path::new("/tmp/vanon");
        assert_ne!(
            download_path(work, "a/clip.mp4"),
            download_path(work, "b/clip.mp4")
        );
        assert_ne!(
            download_path(work, "clip.mp4"),
            output_path(work, "clip.mp4")
        );
        assert_eq!(
            download_path(work, "a/clip.mp4"),
            PathBuf::from("/tmp/vanon/downloads/a/clip.mp4")
        );
    }

    #[test]
    fn content_type_guessing() {
        assert_eq!(guess_content_type("clip.mp4"), "video/mp4");
        assert_eq!(guess_content_type("CLIP.MP4"), "video/mp4");
        assert_eq!(guess_content_type("clip.mov"), "video/quicktime");
        assert_eq!(guess_content_type("clip.bin"), "application/octet-stream");
    }

    #[test]
    fn rejects_hostile_keys() {
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("../escape.mp4").is_err());
        assert!(validate_key("a/../../escape.mp4").is_err());
        assert!(validate_key("a/b/clip.mp4").is_ok());
        // A dot-dot inside a name is fine, only whole components are blocked
        assert!(validate_key("clip..mp4").is_ok());
    }
}
