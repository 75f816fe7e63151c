use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Determine format from a lowercase file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// Where an image stands in the tagging process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaggingState {
    Untagged,
    Tagged,
    SkippedKnownBad,
    SkippedAlreadyTagged,
}

/// A hash-named image found by the directory walk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Full path to the image file
    pub path: PathBuf,

    /// 32 lowercase hex characters taken from the filename
    pub content_hash: String,

    /// Lowercase extension as it appears in the filename
    pub extension: String,

    /// Image format derived from the extension
    pub format: ImageFormat,

    pub tagging_state: TaggingState,
}

/// Why a candidate was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Partial run and the image already carries keywords
    AlreadyTagged,

    /// Partial run and the hash is in the negative cache
    KnownBad,

    /// Every provider answered that it has no record
    NotFound,

    /// At least one provider could not be reached; retry next run
    ProvidersUnavailable,
}

/// Result of processing a single candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileOutcome {
    /// Tags were written to `path`
    Tagged { path: PathBuf, converted: bool },

    Skipped(SkipReason),

    /// Processing stopped with an error; the run carried on
    Failed(String),
}

/// Totals for a whole run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub candidates: usize,
    pub tagged: usize,
    pub converted: usize,
    pub archived: usize,
    pub skipped_already_tagged: usize,
    pub skipped_known_bad: usize,
    pub not_found: usize,
    pub unavailable: usize,
    pub failures: Vec<(PathBuf, String)>,
}

impl RunSummary {
    /// Fold one file's outcome into the totals
    pub fn record(&mut self, path: PathBuf, outcome: &FileOutcome) {
        self.candidates += 1;
        match outcome {
            FileOutcome::Tagged { converted, .. } => {
                self.tagged += 1;
                if *converted {
                    self.converted += 1;
                }
            }
            FileOutcome::Skipped(SkipReason::AlreadyTagged) => self.skipped_already_tagged += 1,
            FileOutcome::Skipped(SkipReason::KnownBad) => self.skipped_known_bad += 1,
            FileOutcome::Skipped(SkipReason::NotFound) => self.not_found += 1,
            FileOutcome::Skipped(SkipReason::ProvidersUnavailable) => self.unavailable += 1,
            FileOutcome::Failed(reason) => self.failures.push((path, reason.clone())),
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Candidates:             {}", self.candidates)?;
        writeln!(f, "Tagged:                 {}", self.tagged)?;
        writeln!(f, "Converted from PNG:     {}", self.converted)?;
        writeln!(f, "Originals archived:     {}", self.archived)?;
        writeln!(f, "Skipped (tagged):       {}", self.skipped_already_tagged)?;
        writeln!(f, "Skipped (known bad):    {}", self.skipped_known_bad)?;
        writeln!(f, "No tags found:          {}", self.not_found)?;
        writeln!(f, "Providers unavailable:  {}", self.unavailable)?;
        write!(f, "Failed:                 {}", self.failures.len())?;
        for (path, reason) in &self.failures {
            write!(f, "\n  {}: {}", path.display(), reason)?;
        }
        Ok(())
    }
}
