//! Error types for the rating engine
//!
//! Input defects never surface here: malformed games are dropped and
//! numerical trouble is reported through [`crate::types::RatingWarning`].
//! These errors cover misconfiguration and unreadable input documents.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific rating scenarios
#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Invalid game input: {reason}")]
    InputError { reason: String },
}
