//! Error types for the sidecar sync engine.

use thiserror::Error;

use texbinet_converters::ConversionError;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur in the sync engine.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Watched directory not found.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Watched path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Converter failed on a source file.
    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A worker thread panicked.
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}
