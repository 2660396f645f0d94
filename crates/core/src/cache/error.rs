//! Cache error types.

use thiserror::Error;

/// Cache operation errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend could not be reached.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// The cache backend rejected the operation.
    #[error("cache operation failed: {0}")]
    Operation(String),
}
