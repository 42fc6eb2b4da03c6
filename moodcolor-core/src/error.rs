//! Error types for the MoodColor core library.

use thiserror::Error;

/// Top-level error type for all MoodColor core operations.
///
/// Domain operations on [`crate::service::EmotionService`] never return this
/// type: bad emotion or event names are logged and degrade to defaults.
/// Errors only surface from codecs, storage and configuration loading.
#[derive(Error, Debug)]
pub enum MoodError {
    /// A history record with the given ID was not found.
    #[error("Record not found: {0}")]
    RecordNotFound(crate::RecordId),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Compressed payload could not be decoded or inflated.
    #[error("Compression error: {0}")]
    Compression(String),

    /// Encryption or decryption failure (bad key, corrupt ciphertext, bad padding).
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for MoodError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, MoodError>;
