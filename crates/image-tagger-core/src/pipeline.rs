use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{error, info, warn};
use std::fs;
use std::path::Path;

use crate::archive::ArchiveManager;
use crate::config::Config;
use crate::conversion::{convert_to_jpeg, jpeg_path_for};
use crate::error::Result;
use crate::logging::{log_file_error, log_fs_modification};
use crate::metadata::{original_backup_path, MetadataTool};
use crate::resolver::{NegativeCache, Resolution, TagResolver};
use crate::types::{FileOutcome, ImageFormat, ImageRecord, RunSummary, SkipReason, TaggingState};

/// Drives resolve → convert → tag → archive for each candidate, one file at a time
pub struct Pipeline<'a> {
    config: &'a Config,
    resolver: &'a TagResolver,
    tool: &'a dyn MetadataTool,
    archive: &'a mut ArchiveManager,
    cache: &'a mut NegativeCache,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        resolver: &'a TagResolver,
        tool: &'a dyn MetadataTool,
        archive: &'a mut ArchiveManager,
        cache: &'a mut NegativeCache,
    ) -> Self {
        Self {
            config,
            resolver,
            tool,
            archive,
            cache,
        }
    }

    /// Process every record; a failure on one file never stops the others
    pub fn process_all(&mut self, records: &mut [ImageRecord]) -> RunSummary {
        let progress = ProgressBar::new(records.len() as u64);
        if self.config.show_progress {
            if let Ok(style) = ProgressStyle::default_bar()
                .template("[{eta}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
            {
                progress.set_style(style.progress_chars("##-"));
            }
        } else {
            progress.set_draw_target(ProgressDrawTarget::hidden());
        }

        let mut summary = RunSummary::default();
        for record in records.iter_mut() {
            progress.set_message(record.content_hash.clone());

            let outcome = self.process_image(record).unwrap_or_else(|e| {
                error!("Unexpected error processing image: {}", record.path.display());
                log_file_error(&record.path, "process", &e);
                FileOutcome::Failed(e.to_string())
            });
            summary.record(record.path.clone(), &outcome);
            progress.inc(1);
        }

        progress.finish_with_message(format!("{} tagged", summary.tagged));
        summary
    }

    /// Process one candidate image
    pub fn process_image(&mut self, record: &mut ImageRecord) -> Result<FileOutcome> {
        if self.config.partial {
            if self.cache.contains(&record.content_hash) {
                record.tagging_state = TaggingState::SkippedKnownBad;
                return Ok(FileOutcome::Skipped(SkipReason::KnownBad));
            }
            if record.format == ImageFormat::Jpeg && self.tool.already_tagged(&record.path)? {
                record.tagging_state = TaggingState::SkippedAlreadyTagged;
                return Ok(FileOutcome::Skipped(SkipReason::AlreadyTagged));
            }
        }

        let tags = match self.resolver.resolve(&record.content_hash, self.cache) {
            Resolution::Found(tags) => tags,
            Resolution::NotFound => {
                info!("No tags found anywhere for {}", record.content_hash);
                return Ok(FileOutcome::Skipped(SkipReason::NotFound));
            }
            Resolution::Unavailable => {
                return Ok(FileOutcome::Skipped(SkipReason::ProvidersUnavailable));
            }
        };

        let outcome = match record.format {
            ImageFormat::Jpeg => self.process_jpeg(&record.path, &tags)?,
            ImageFormat::Png => self.process_png(&record.path, &tags)?,
        };

        if let FileOutcome::Tagged { .. } = outcome {
            record.tagging_state = TaggingState::Tagged;
        }
        Ok(outcome)
    }

    fn process_jpeg(&mut self, path: &Path, tags: &str) -> Result<FileOutcome> {
        if !self.tool.write_tags(path, tags)? {
            return Ok(FileOutcome::Failed(format!(
                "tagging utility failed on {}",
                path.display()
            )));
        }

        let original = original_backup_path(path);
        if original.exists() {
            self.archive.absorb(&original)?;
        } else {
            warn!("No pre-write backup found at {}", original.display());
        }

        Ok(FileOutcome::Tagged {
            path: path.to_path_buf(),
            converted: false,
        })
    }

    fn process_png(&mut self, path: &Path, tags: &str) -> Result<FileOutcome> {
        let (jpeg, converted) = match convert_to_jpeg(path, self.config.jpeg_quality) {
            Ok(jpeg) => {
                info!("Conversion successful: {}", jpeg.display());
                self.archive.absorb(path)?;
                (jpeg, true)
            }
            Err(e) => {
                log_file_error(path, "convert", &e);
                // A JPEG from an earlier run may already sit next to the PNG
                let jpeg = jpeg_path_for(path);
                if !jpeg.exists() {
                    return Ok(FileOutcome::Failed(format!("conversion failed: {}", e)));
                }
                (jpeg, false)
            }
        };

        if !self.tool.write_tags(&jpeg, tags)? {
            return Ok(FileOutcome::Failed(format!(
                "tagging utility failed on {}",
                jpeg.display()
            )));
        }

        // The PNG itself was archived, so the tool's copy of the new JPEG is dropped
        remove_byproduct(&original_backup_path(&jpeg))?;

        Ok(FileOutcome::Tagged {
            path: jpeg,
            converted,
        })
    }
}

fn remove_byproduct(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
        log_fs_modification("delete", path, Some("tagging byproduct"));
    }
    Ok(())
}
