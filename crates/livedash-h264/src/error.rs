//! Error types for livedash-h264

/// Result type for livedash-h264 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing H.264 syntax or reconstructing timestamps
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A bitstream field was truncated or out of range
    #[error("Failed to parse {context}: {reason}")]
    Parse {
        context: &'static str,
        reason: String,
    },

    /// Caller supplied a value the session cannot work with
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Timing requested before a parameter set was installed
    #[error("Parameter set not initialized")]
    NotInitialized,
}

impl Error {
    /// Create a parse error for the named syntax structure.
    pub fn parse(context: &'static str, reason: impl Into<String>) -> Self {
        Self::Parse {
            context,
            reason: reason.into(),
        }
    }
}
