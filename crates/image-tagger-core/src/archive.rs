//! Backup archive of pre-modification originals.
//!
//! Between runs the originals live in a single `<backup_dir>.tgz`. A run unpacks
//! that tarball into the backup directory, moves new originals in next to the
//! old ones, then packs everything back up and removes the directory.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{info, warn};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::{log_file_error, log_fs_modification};

/// Lifecycle of the archive within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    Idle,
    Prepared,
    Accumulating,
    Compressed,
}

/// What happened to a file handed to [`ArchiveManager::absorb`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Absorbed {
    /// Moved into the working directory at this path
    Moved(PathBuf),

    /// A file with the same name was already archived; the incoming one was deleted
    Discarded,
}

pub struct ArchiveManager {
    working_dir: PathBuf,
    tarball: PathBuf,
    state: ArchiveState,
    absorbed: usize,
}

impl ArchiveManager {
    pub fn new(working_dir: impl Into<PathBuf>, tarball: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            tarball: tarball.into(),
            state: ArchiveState::Idle,
            absorbed: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.backup_dir, config.tarball_path())
    }

    pub fn state(&self) -> ArchiveState {
        self.state
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn tarball(&self) -> &Path {
        &self.tarball
    }

    /// Number of files moved in during this run
    pub fn absorbed(&self) -> usize {
        self.absorbed
    }

    /// Scratch file the tarball is written to before being renamed into place
    fn partial_tarball(&self) -> PathBuf {
        let mut name = self
            .tarball
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "originals.tgz".into());
        name.push(".tmp");
        self.tarball.with_file_name(name)
    }

    fn expect_state(&self, allowed: &[ArchiveState], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "cannot {} archive in state {:?}",
                operation, self.state
            )))
        }
    }

    /// Create the working directory and unpack any tarball left by a previous run.
    ///
    /// Files already sitting in the working directory are kept. A half-written
    /// tarball from a run killed during [`finalize`](Self::finalize) is dropped;
    /// the working directory it was being built from is still intact.
    pub fn prepare(&mut self) -> Result<()> {
        self.expect_state(&[ArchiveState::Idle], "prepare")?;

        fs::create_dir_all(&self.working_dir)?;

        let partial = self.partial_tarball();
        if partial.exists() {
            warn!("Removing incomplete tarball {}", partial.display());
            fs::remove_file(&partial)?;
            log_fs_modification("delete", &partial, Some("incomplete tarball"));
        }

        if self.tarball.exists() {
            info!("Unpacking backup tarball {}...", self.tarball.display());
            let decoder = GzDecoder::new(File::open(&self.tarball)?);
            let mut archive = tar::Archive::new(decoder);
            archive.unpack(&self.working_dir).map_err(|e| {
                Error::Archive(format!(
                    "failed to unpack {}: {}",
                    self.tarball.display(),
                    e
                ))
            })?;
            fs::remove_file(&self.tarball)?;
            log_fs_modification(
                "unpack",
                &self.tarball,
                Some(&self.working_dir.display().to_string()),
            );
        }

        self.state = ArchiveState::Prepared;
        Ok(())
    }

    /// Move `original` into the working directory under its base name.
    ///
    /// The archive keeps the first copy it saw: if the name is taken the incoming
    /// file is deleted instead.
    pub fn absorb(&mut self, original: &Path) -> Result<Absorbed> {
        self.expect_state(
            &[ArchiveState::Prepared, ArchiveState::Accumulating],
            "absorb into",
        )?;

        let name = original
            .file_name()
            .ok_or_else(|| Error::FileNotFound(original.to_path_buf()))?;
        let destination = self.working_dir.join(name);
        self.state = ArchiveState::Accumulating;

        if destination.exists() {
            fs::remove_file(original)?;
            log_fs_modification("delete", original, Some("already archived"));
            return Ok(Absorbed::Discarded);
        }

        move_file(original, &destination)?;
        log_fs_modification(
            "archive",
            original,
            Some(&destination.display().to_string()),
        );
        self.absorbed += 1;
        Ok(Absorbed::Moved(destination))
    }

    /// Pack the working directory into the tarball and remove the directory.
    ///
    /// Runs even when nothing was absorbed, so a no-op run leaves the archive as
    /// it found it. The tarball is written beside its final name and renamed
    /// into place once complete; the working directory is only removed after.
    pub fn finalize(&mut self) -> Result<()> {
        self.expect_state(
            &[ArchiveState::Prepared, ArchiveState::Accumulating],
            "finalize",
        )?;

        info!("Compressing backup images into {}...", self.tarball.display());
        let partial = self.partial_tarball();
        let entries = match self.write_tarball(&partial) {
            Ok(entries) => entries,
            Err(e) => {
                log_file_error(&partial, "compress", &e);
                let _ = fs::remove_file(&partial);
                return Err(e);
            }
        };
        fs::rename(&partial, &self.tarball)?;

        fs::remove_dir_all(&self.working_dir)?;
        log_fs_modification(
            "compress",
            &self.tarball,
            Some(&format!("{} entries", entries)),
        );

        self.state = ArchiveState::Compressed;
        Ok(())
    }

    /// Write every file under the working directory into `path`, returning the entry count
    fn write_tarball(&self, path: &Path) -> Result<usize> {
        let file = File::create(path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut names = HashSet::new();

        for entry in WalkDir::new(&self.working_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            // Entries are stored flat under their base names
            let name = entry.file_name().to_os_string();
            if !names.insert(name.clone()) {
                warn!("Skipping duplicate archive entry {}", entry.path().display());
                continue;
            }
            builder.append_path_with_name(entry.path(), &name)?;
        }

        builder.into_inner()?.finish()?.sync_all()?;
        Ok(names.len())
    }
}

/// Rename, falling back to copy and delete across filesystems
fn move_file(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if let Err(e) = fs::copy(from, to) {
                log_file_error(from, "move", &e);
                let _ = fs::remove_file(to);
                return Err(rename_err.into());
            }
            fs::remove_file(from)?;
            Ok(())
        }
    }
}
