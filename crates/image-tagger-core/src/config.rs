use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::discovery::normalize_path;
use crate::error::{Error, Result};

/// Configuration for a tagging run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory tree containing the images to be tagged
    pub target_dir: PathBuf,

    /// Working directory for pre-modification originals; the tarball sits next to it
    pub backup_dir: PathBuf,

    /// Skip images that are already tagged or known to have no tags
    pub partial: bool,

    /// Line-delimited file of hashes no provider knows about
    pub negative_cache_path: PathBuf,

    /// Base URL of the primary provider (Danbooru-style API)
    pub danbooru_url: String,

    /// Base URL of the fallback provider (Gelbooru-style API)
    pub gelbooru_url: String,

    /// Tagging utility executable
    pub exiftool_path: PathBuf,

    /// Metadata field the tags are written to
    pub keyword_field: String,

    /// JPEG quality used when converting PNGs (1-100)
    pub jpeg_quality: u8,

    /// HTTP timeout in seconds; `None` blocks indefinitely
    pub http_timeout_secs: Option<u64>,

    /// Directory for rolling log files; console logging when unset
    pub log_dir: Option<PathBuf>,

    /// Log level
    pub log_level: LogLevel,

    /// Whether to draw a progress bar while tagging
    pub show_progress: bool,
}

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("images"),
            backup_dir: PathBuf::from("originals"),
            partial: false,
            negative_cache_path: PathBuf::from("knownBadMD5s.txt"),
            danbooru_url: "http://danbooru.donmai.us".to_string(),
            gelbooru_url: "http://gelbooru.com".to_string(),
            exiftool_path: PathBuf::from("exiftool"),
            keyword_field: "XPKeywords".to_string(),
            jpeg_quality: 100,
            http_timeout_secs: None,
            log_dir: None,
            log_level: LogLevel::Info,
            show_progress: true,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Path of the tarball holding originals between runs: `<backup_dir>.tgz`
    pub fn tarball_path(&self) -> PathBuf {
        let mut name = self
            .backup_dir
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "originals".into());
        name.push(".tgz");
        self.backup_dir.with_file_name(name)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.danbooru_url.trim().is_empty() || self.gelbooru_url.trim().is_empty() {
            return Err(Error::Configuration(
                "Provider URLs must not be empty".to_string(),
            ));
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::Configuration(
                "JPEG quality must be between 1 and 100".to_string(),
            ));
        }

        if self.keyword_field.trim().is_empty() {
            return Err(Error::Configuration(
                "Keyword field must not be empty".to_string(),
            ));
        }

        self.check_backup_location()?;

        Ok(())
    }

    /// Reject a backup directory equal to or inside the target directory.
    ///
    /// Both paths are made absolute and normalized first, so `-t . -b originals`
    /// is caught as well as the spelled-out form.
    pub fn check_backup_location(&self) -> Result<()> {
        let target = normalize_path(&self.target_dir)?;
        let backup = normalize_path(&self.backup_dir)?;

        if backup.starts_with(&target) {
            return Err(Error::Configuration(format!(
                "Backup directory {} must not be inside the target directory {}",
                self.backup_dir.display(),
                self.target_dir.display()
            )));
        }
        Ok(())
    }
}
