//! Error types for livedash-dash.

use std::io;
use thiserror::Error;

/// Result type for livedash-dash operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for livedash-dash operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected input, nothing was changed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No segment starts at this timestamp (never appended or already evicted).
    #[error("Segment not found at timestamp {0}")]
    NotFound(i64),

    /// Track metadata has not been set.
    #[error("Not initialized: {0}")]
    NotInitialized(&'static str),

    /// The XML writer failed while writing the document.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The rendered document was not valid UTF-8.
    #[error("Manifest encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
