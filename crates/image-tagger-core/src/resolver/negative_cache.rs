use log::info;
use std::collections::BTreeSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// Hashes that no provider has tags for.
///
/// Stored on disk as one hash per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegativeCache {
    hashes: BTreeSet<String>,
}

impl NegativeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the cache file; a missing file is an empty cache
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };

        let hashes: BTreeSet<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        info!(
            "Loaded {} known bad hashes from {}",
            hashes.len(),
            path.display()
        );
        Ok(Self { hashes })
    }

    /// Overwrite the cache file with the current contents.
    ///
    /// Written to a sibling temp file first and renamed into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut tmp_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "negative-cache".into());
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        {
            let mut writer = BufWriter::new(fs::File::create(&tmp_path)?);
            for hash in &self.hashes {
                writeln!(writer, "{}", hash)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, path)?;

        info!(
            "Saved {} known bad hashes to {}",
            self.hashes.len(),
            path.display()
        );
        Ok(())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// Returns true if the hash was not already cached
    pub fn insert(&mut self, hash: &str) -> bool {
        self.hashes.insert(hash.to_string())
    }

    /// Returns true if the hash was cached
    pub fn remove(&mut self, hash: &str) -> bool {
        self.hashes.remove(hash)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
