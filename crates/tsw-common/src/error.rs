//! Error types shared by the sink crates.

use thiserror::Error;

/// Result type alias for sink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the sink crates.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid config file {path}: {message}")]
    InvalidConfigFile { path: String, message: String },

    // Input errors (20-29)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Submission errors (30-39)
    #[error("submission failed: {0}")]
    Submission(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfigFile { .. } => 11,
            Error::InvalidInput(_) => 20,
            Error::Submission(_) => 30,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }
}
