use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the image-tagger library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode/encode error
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP transport error while talking to a tag provider
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed JSON from a tag provider
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory walk error
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Backup archive error
    #[error("Archive error: {0}")]
    Archive(String),

    /// External tagging utility error
    #[error("Tagging utility failed on {path}: {message}")]
    Tool { path: PathBuf, message: String },

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Operation called out of order
    #[error("Invalid state: {0}")]
    InvalidState(String),
}
