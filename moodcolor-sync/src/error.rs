//! Sync error types.

use moodcolor_core::MoodError;
use thiserror::Error;

/// Errors that can occur at the persistence / sync boundary.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local storage failed.
    #[error("Local storage error: {0}")]
    Storage(#[from] MoodError),

    /// The remote store rejected or failed an operation.
    #[error("Remote store error: {0}")]
    Remote(String),

    /// A blocking storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Coarse classification of a failure for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connectivity problems.
    Network,
    /// Missing credentials or access rights.
    Permission,
    /// The requested data does not exist.
    NotFound,
    /// The operation took too long.
    Timeout,
    /// Storage or rate limits exceeded.
    Quota,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Classify a raw error message by well-known substrings.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let m = message.to_ascii_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| m.contains(n));

        if has(&["network", "connection", "unavailable", "offline"]) {
            Self::Network
        } else if has(&["permission", "denied", "unauthorized", "unauthenticated"]) {
            Self::Permission
        } else if has(&["not found", "not-found", "no such"]) {
            Self::NotFound
        } else if has(&["timeout", "timed out", "deadline"]) {
            Self::Timeout
        } else if has(&["quota", "resource-exhausted", "rate limit"]) {
            Self::Quota
        } else {
            Self::Unknown
        }
    }

    /// Message suitable for showing to the user.
    #[must_use]
    pub fn friendly_message(self) -> &'static str {
        match self {
            Self::Network => "Network error. Please check your connection and try again.",
            Self::Permission => "You don't have permission to access this data.",
            Self::NotFound => "The requested data could not be found.",
            Self::Timeout => "The operation timed out. Please try again.",
            Self::Quota => "Storage limit reached. Please try again later.",
            Self::Unknown => "Something went wrong. Please try again.",
        }
    }
}

impl SyncError {
    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(MoodError::RecordNotFound(_)) => ErrorKind::NotFound,
            other => ErrorKind::classify(&other.to_string()),
        }
    }

    /// Message suitable for showing to the user.
    #[must_use]
    pub fn friendly_message(&self) -> &'static str {
        self.kind().friendly_message()
    }
}

/// Result alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
