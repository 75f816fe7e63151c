use clap::{Parser, Subcommand};
use image_tagger_core::{logging, Config, ImageTagger, LogLevel};
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "image-tagger")]
#[command(about = "Tag hash-named images from online metadata and archive the originals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag every hash-named image under the target directory
    Run {
        /// Directory containing the images to be tagged
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Directory where originals are collected; the tarball sits next to it
        #[arg(short, long)]
        backup: Option<PathBuf>,

        /// Don't retag tagged images or requery hashes known to have no tags
        #[arg(long)]
        partial: bool,

        /// Write logs to rotating files in this directory instead of the console
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Don't draw a progress bar
        #[arg(long)]
        no_progress: bool,

        /// Verbosity level
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "image-tagger.json")]
        path: PathBuf,
    },
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            target,
            backup,
            partial,
            log_dir,
            no_progress,
            verbose,
            config,
        } => {
            let mut config = if let Some(config_path) = config {
                Config::from_file(&config_path)?
            } else {
                Config::default()
            };

            // Override config with command line arguments
            if let Some(target) = target {
                config.target_dir = target;
            }
            if let Some(backup) = backup {
                config.backup_dir = backup;
            }
            if log_dir.is_some() {
                config.log_dir = log_dir;
            }
            config.partial |= partial;
            config.show_progress &= !no_progress;

            config.log_level = match verbose {
                0 => config.log_level,
                1 => LogLevel::Debug,
                _ => LogLevel::Trace,
            };

            match &config.log_dir {
                Some(dir) => logging::init_logger(dir, config.log_level.into())?,
                None => env_logger::Builder::new()
                    .filter_level(config.log_level.into())
                    .parse_env(logging::LOG_ENV_VAR)
                    .init(),
            }

            if !config.target_dir.is_dir() {
                anyhow::bail!(
                    "Target directory {} not found",
                    config.target_dir.display()
                );
            }

            let tagger = ImageTagger::new(config)?;

            info!("Starting image tagging...");
            let summary = tagger.run()?;
            info!("Tagging complete");

            if !summary.failures.is_empty() {
                warn!("{} images failed", summary.failures.len());
            }
            println!("{}", summary);

            Ok(())
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}
