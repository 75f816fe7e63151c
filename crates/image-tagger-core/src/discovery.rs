use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::{ImageFormat, ImageRecord, TaggingState};

/// `<32 lowercase hex>.<word characters>`
static HASH_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-f0-9]{32})\.(\w+)$").expect("hash filename pattern is valid"));

/// Split a hash-named image filename into (hash, extension).
///
/// Returns `None` for anything that is not `<hash>.jpg`, `<hash>.jpeg` or `<hash>.png`,
/// including names with more than one `.`.
pub fn classify(filename: &str) -> Option<(String, String)> {
    let captures = HASH_FILENAME.captures(filename)?;
    let hash = captures.get(1)?.as_str();
    let ext = captures.get(2)?.as_str();

    ImageFormat::from_extension(ext)?;
    Some((hash.to_string(), ext.to_string()))
}

/// Build a record for `path` if its filename is a tagging candidate
pub fn classify_path(path: &Path) -> Option<ImageRecord> {
    let filename = path.file_name()?.to_str()?;
    let (content_hash, extension) = classify(filename)?;
    let format = ImageFormat::from_extension(&extension)?;

    Some(ImageRecord {
        path: path.to_path_buf(),
        content_hash,
        extension,
        format,
        tagging_state: TaggingState::Untagged,
    })
}

/// Walk `directory` and return every tagging candidate, in a stable order
pub fn discover_images(directory: &Path) -> Result<Vec<ImageRecord>> {
    walk_candidates(directory, None)
}

/// Like [`discover_images`], but never descends into `excluded`.
///
/// Used to keep the archive working directory out of the walk when it sits
/// under the target tree.
pub fn discover_images_excluding(directory: &Path, excluded: &Path) -> Result<Vec<ImageRecord>> {
    let excluded = normalize_path(excluded)?;
    walk_candidates(directory, Some(&excluded))
}

fn walk_candidates(directory: &Path, excluded: Option<&Path>) -> Result<Vec<ImageRecord>> {
    if !directory.is_dir() {
        return Err(Error::FileNotFound(directory.to_path_buf()));
    }

    let mut records = Vec::new();

    let walker = WalkDir::new(directory)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| match excluded {
            Some(excluded) if entry.file_type().is_dir() => {
                let skip = normalize_path(entry.path())
                    .map(|path| path == excluded)
                    .unwrap_or(false);
                if skip {
                    debug!("Skipping archive directory {}", entry.path().display());
                }
                !skip
            }
            _ => true,
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Unreadable subtrees are skipped, the root itself was checked above
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match classify_path(entry.path()) {
            Some(record) => records.push(record),
            None => debug!("Not a candidate: {}", entry.path().display()),
        }
    }

    Ok(records)
}

/// Absolute, `.`/`..`-free form of `path`.
///
/// The longest existing prefix is canonicalized so symlinks resolve; the rest
/// is appended as written. The path itself need not exist.
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let lexical = lexical_normalize(&absolute);

    let mut existing = lexical.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut normalized = canonical;
            normalized.extend(missing.iter().rev());
            return Ok(normalized);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => break,
        }
    }
    Ok(lexical)
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

// -- Tests --

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const HASH: &str = "0123456789abcdef0123456789abcdef";

    fn create_test_file(dir: &Path, name: &str) -> PathBuf {
        let file_path = dir.join(name);
        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"DUMMY IMAGE DATA").unwrap();
        file_path
    }

    #[test]
    fn test_classify_candidates() {
        assert_eq!(
            classify(&format!("{}.jpg", HASH)),
            Some((HASH.to_string(), "jpg".to_string()))
        );
        assert_eq!(
            classify(&format!("{}.jpeg", HASH)),
            Some((HASH.to_string(), "jpeg".to_string()))
        );
        assert_eq!(
            classify(&format!("{}.png", HASH)),
            Some((HASH.to_string(), "png".to_string()))
        );
    }

    #[test]
    fn test_classify_rejects_non_candidates() {
        // Wrong extension
        assert_eq!(classify(&format!("{}.gif", HASH)), None);
        // Uppercase hex
        assert_eq!(classify(&format!("{}.jpg", HASH.to_uppercase())), None);
        // Uppercase extension
        assert_eq!(classify(&format!("{}.JPG", HASH)), None);
        // Too short
        assert_eq!(classify("0123456789abcdef.jpg"), None);
        // More than one separator
        assert_eq!(classify(&format!("{}.jpg.png", HASH)), None);
        assert_eq!(classify(&format!("{}.jpg_original", HASH)), None);
        // Not hex
        assert_eq!(classify("zz23456789abcdef0123456789abcdef.jpg"), None);
        assert_eq!(classify("holiday.jpg"), None);
    }

    #[test]
    fn test_discover_images_recurses_and_filters() {
        let dir = tempdir().unwrap();
        let subdir = dir.path().join("subdir");
        fs::create_dir(&subdir).unwrap();

        let jpg = create_test_file(dir.path(), &format!("{}.jpg", HASH));
        let png = create_test_file(&subdir, "ffffffffffffffffffffffffffffffff.png");
        create_test_file(dir.path(), "holiday.jpg");
        create_test_file(dir.path(), &format!("{}.jpg_original", HASH));
        create_test_file(dir.path(), "notes.txt");

        let records = discover_images(dir.path()).unwrap();
        let paths: Vec<PathBuf> = records.iter().map(|r| r.path.clone()).collect();

        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&jpg));
        assert!(paths.contains(&png));

        let png_record = records.iter().find(|r| r.path == png).unwrap();
        assert_eq!(png_record.format, ImageFormat::Png);
        assert_eq!(png_record.tagging_state, TaggingState::Untagged);
    }

    #[test]
    fn test_discover_images_nonexistent_directory() {
        let result = discover_images(Path::new("/path/that/does/not/exist"));
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_discover_images_skips_excluded_directory() {
        let dir = tempdir().unwrap();
        let archive_dir = dir.path().join("originals");
        fs::create_dir(&archive_dir).unwrap();

        let jpg = create_test_file(dir.path(), &format!("{}.jpg", HASH));
        create_test_file(&archive_dir, "ffffffffffffffffffffffffffffffff.png");

        // Spelled differently from the walk root on purpose
        let excluded = dir.path().join(".").join("sub").join("..").join("originals");
        let records = discover_images_excluding(dir.path(), &excluded).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, jpg);
    }

    #[test]
    fn test_normalize_path_resolves_relative_and_dot_components() {
        let cwd = std::env::current_dir().unwrap().canonicalize().unwrap();

        assert_eq!(normalize_path(Path::new(".")).unwrap(), cwd);
        assert_eq!(
            normalize_path(Path::new("./missing/../originals")).unwrap(),
            cwd.join("originals")
        );
        assert_eq!(
            normalize_path(Path::new("not-there/yet")).unwrap(),
            cwd.join("not-there").join("yet")
        );
    }
}
