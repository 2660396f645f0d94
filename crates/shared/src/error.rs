//! Application-wide error types.

use thiserror::Error;

/// Application error types.
///
/// Every variant maps to exactly one HTTP status, so transports can translate
/// errors exhaustively.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Upload body exceeds the configured size limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Image could not be decoded, transformed, or encoded.
    #[error("Processing error: {0}")]
    Processing(String),

    /// Object store, metadata store, or cache failure.
    #[error("Adapter error: {0}")]
    Adapter(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::PayloadTooLarge(_) => 413,
            Self::Processing(_) | Self::Adapter(_) => 500,
        }
    }

    /// Returns the message that is safe to show to API clients.
    ///
    /// Server-side failures keep their detail in the logs only.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::PayloadTooLarge(msg) | Self::NotFound(msg) => {
                msg.clone()
            }
            Self::Processing(msg) => format!("Image processing failed: {msg}"),
            Self::Adapter(_) => "An error occurred".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
