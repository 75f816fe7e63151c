//! Core functionality for tagging hash-named images.
//!
//! This library provides the components of a tagging run:
//! - Discovery of `<md5>.<ext>` images in a directory tree
//! - Tag lookup across metadata providers with a negative cache
//! - PNG to JPEG conversion
//! - Keyword writing through exiftool
//! - A tarball archive of pre-modification originals

// -- External Dependencies --
use log::info;
use std::path::Path;

// -- Public Re-exports --
pub use config::*;
pub use error::{Error, Result};
pub use types::*;

// -- Public Modules --
pub mod archive;
pub mod config;
pub mod conversion;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod resolver;
pub mod types;

use archive::ArchiveManager;
use metadata::{ExifTool, MetadataTool};
use pipeline::Pipeline;
use resolver::{NegativeCache, TagResolver};

/// Main entry point for a tagging run
pub struct ImageTagger {
    config: Config,
    resolver: TagResolver,
    tool: Box<dyn MetadataTool>,
}

impl ImageTagger {
    /// Create an ImageTagger talking to the configured providers and exiftool
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let resolver = TagResolver::from_config(&config)?;
        let tool = Box::new(ExifTool::from_config(&config));
        Ok(Self::with_components(config, resolver, tool))
    }

    /// Create an ImageTagger from explicit providers and tagging tool
    pub fn with_components(
        config: Config,
        resolver: TagResolver,
        tool: Box<dyn MetadataTool>,
    ) -> Self {
        Self {
            config,
            resolver,
            tool,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discover all tagging candidates under the target directory, leaving out
    /// the archive working directory
    pub fn discover_images(&self) -> Result<Vec<ImageRecord>> {
        discovery::discover_images_excluding(&self.config.target_dir, &self.config.backup_dir)
    }

    /// Run the full pipeline: prepare the archive, tag every candidate, then
    /// compress the archive and persist the negative cache.
    ///
    /// Only an inaccessible target or backup directory fails the whole run;
    /// per-file problems end up in the summary.
    pub fn run(&self) -> Result<RunSummary> {
        let target = &self.config.target_dir;
        if !target.is_dir() {
            return Err(Error::FileNotFound(target.clone()));
        }
        self.config.check_backup_location()?;

        let mut cache = self.load_negative_cache()?;

        let mut archive = ArchiveManager::from_config(&self.config);
        archive.prepare()?;

        info!("Discovering images in {}...", target.display());
        let mut records = self.discover_images()?;
        info!("Found {} candidate images", records.len());

        let mut summary = Pipeline::new(
            &self.config,
            &self.resolver,
            self.tool.as_ref(),
            &mut archive,
            &mut cache,
        )
        .process_all(&mut records);
        summary.archived = archive.absorbed();

        // Persist what we learned even if packing the archive fails
        let finalized = archive.finalize();
        self.save_negative_cache(&cache)?;
        finalized?;

        info!("Tagging run complete: {} tagged", summary.tagged);
        Ok(summary)
    }

    fn load_negative_cache(&self) -> Result<NegativeCache> {
        if self.config.partial {
            NegativeCache::load(&self.config.negative_cache_path)
        } else {
            Ok(NegativeCache::new())
        }
    }

    fn save_negative_cache(&self, cache: &NegativeCache) -> Result<()> {
        let path: &Path = &self.config.negative_cache_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        cache.save(path)
    }
}
