#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use image_tagger_core::metadata::{original_backup_path, MetadataTool};
use image_tagger_core::resolver::{ProviderResponse, TagProvider, TagResolver};
use image_tagger_core::{Config, Result};

pub const PNG_HASH: &str = "0123456789abcdef0123456789abcdcd";
pub const JPG_HASH: &str = "abcdef0123456789abcdef01234567ef";

/// Provider answering from a fixed table and recording every hash it is asked about
#[derive(Clone, Default)]
pub struct FakeProvider {
    responses: HashMap<String, ProviderResponse>,
    pub calls: Rc<RefCell<Vec<String>>>,
}

impl FakeProvider {
    pub fn with(mut self, hash: &str, response: ProviderResponse) -> Self {
        self.responses.insert(hash.to_string(), response);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn was_asked(&self, hash: &str) -> bool {
        self.calls.borrow().iter().any(|h| h == hash)
    }
}

impl TagProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn lookup(&self, hash: &str) -> ProviderResponse {
        self.calls.borrow_mut().push(hash.to_string());
        self.responses
            .get(hash)
            .cloned()
            .unwrap_or(ProviderResponse::NoRecord)
    }
}

pub fn resolver(a: &FakeProvider, b: &FakeProvider) -> TagResolver {
    TagResolver::new(vec![Box::new(a.clone()), Box::new(b.clone())])
}

/// Behaves like exiftool: keeps `<file>_original` and remembers the keywords it wrote
#[derive(Clone, Default)]
pub struct FakeExifTool {
    pub written: Rc<RefCell<HashMap<PathBuf, String>>>,
    pub pretagged: Rc<RefCell<Vec<PathBuf>>>,
    pub fail_writes: bool,
}

impl FakeExifTool {
    pub fn tags_for(&self, path: &Path) -> Option<String> {
        self.written.borrow().get(path).cloned()
    }
}

impl MetadataTool for FakeExifTool {
    fn already_tagged(&self, path: &Path) -> Result<bool> {
        Ok(self.pretagged.borrow().iter().any(|p| p == path) || self.tags_for(path).is_some())
    }

    fn write_tags(&self, path: &Path, tags: &str) -> Result<bool> {
        if self.fail_writes || !path.exists() {
            return Ok(false);
        }
        fs::copy(path, original_backup_path(path))?;
        self.written
            .borrow_mut()
            .insert(path.to_path_buf(), tags.to_string());
        Ok(true)
    }
}

/// Scratch layout: `<root>/images` is the target tree, `<root>/originals` the backup dir
pub fn test_config(root: &Path) -> Config {
    let target = root.join("images");
    fs::create_dir_all(&target).unwrap();

    Config {
        target_dir: target,
        backup_dir: root.join("originals"),
        negative_cache_path: root.join("knownBadMD5s.txt"),
        show_progress: false,
        ..Default::default()
    }
}

pub fn create_png(dir: &Path, hash: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("{}.png", hash));
    RgbaImage::from_pixel(8, 8, Rgba([10, 120, 200, 255]))
        .save(&path)
        .unwrap();
    path
}

pub fn create_jpg(dir: &Path, hash: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("{}.jpg", hash));
    RgbImage::from_pixel(8, 8, Rgb([200, 120, 10]))
        .save(&path)
        .unwrap();
    path
}

/// Names of the entries in a gzipped tarball, sorted
pub fn tarball_entries(path: &Path) -> Vec<String> {
    let file = fs::File::open(path).unwrap();
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
    let mut names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|entry| {
            entry
                .unwrap()
                .path()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}
