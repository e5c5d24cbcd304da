//! Error types for decicrate

use thiserror::Error;

/// Main error type for decicrate operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed interchange file. Fatal for the session.
    #[error("Format error at line {line}: {message}")]
    Format { line: usize, message: String },

    /// Numerical failure while building texture-aware quadrics.
    /// The decimation driver recovers from this by falling back to geometry-only quadrics.
    #[error("Degenerate quadric: {0}")]
    DegenerateQuadric(String),

    /// Contradictory or out-of-range configuration, rejected before any mesh mutation.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// Build a format error for the given 1-based line number
    pub fn format<S: Into<String>>(line: usize, message: S) -> Self {
        Error::Format {
            line,
            message: message.into(),
        }
    }

    /// Whether the decimation driver may recover from this error by
    /// retrying without texture data
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DegenerateQuadric(_))
    }
}

/// Result type alias for decicrate operations
pub type Result<T> = std::result::Result<T, Error>;
