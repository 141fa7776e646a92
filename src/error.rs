//! Error types for the export pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, exporting or delivering a card
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration (style file, CLI arguments, URLs)
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Failed to load an input document
    #[error("Failed to load input: {0}")]
    LoadError(String),

    /// Failed to lay out or rasterize the visual tree
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Network error while fetching a resource
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Clipboard is unavailable or rejected the write
    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    /// Writing the downloaded image failed
    #[error("Download failed: {0}")]
    DownloadError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::ConfigError(format!("invalid URL: {}", err))
    }
}
