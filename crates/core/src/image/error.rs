//! Image pipeline error types.

use thiserror::Error;

use prism_shared::AppError;
use prism_shared::types::ImageId;

use crate::cache::CacheError;
use crate::storage::StorageError;

/// Transformation engine failures. Never retried.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The bytes do not start with a known image signature.
    #[error("unrecognized image format")]
    UnknownFormat,

    /// The image is in a format the engine does not handle.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The image could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// A step would produce an image larger than the engine allows.
    #[error("output of {width}x{height} exceeds the maximum dimension")]
    OutputTooLarge {
        /// Width that would have been produced.
        width: u64,
        /// Height that would have been produced.
        height: u64,
    },

    /// The result could not be encoded.
    #[error("failed to encode {format}: {message}")]
    Encode {
        /// Target format.
        format: &'static str,
        /// Encoder message.
        message: String,
    },
}

/// Failure class of an [`ImageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input.
    Validation,
    /// Missing record or backing object.
    NotFound,
    /// Engine failure.
    Processing,
    /// Object store, metadata store, cache, or worker failure.
    Adapter,
}

impl ErrorKind {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::Processing => "processing_error",
            Self::Adapter => "adapter_error",
        }
    }
}

/// Image operation errors.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Missing or malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Upload exceeds the size limit.
    #[error("file too large: {size} bytes exceeds maximum {max} bytes")]
    FileTooLarge {
        /// Actual file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// No metadata record for the image.
    #[error("image not found: {0}")]
    ImageNotFound(ImageId),

    /// The record exists but its backing object does not.
    #[error("object for image {image_id} not found at '{key}'")]
    ObjectNotFound {
        /// Image whose object is missing.
        image_id: ImageId,
        /// Object key that was looked up.
        key: String,
    },

    /// Transformation engine failed.
    #[error("processing error: {0}")]
    Processing(#[from] ProcessingError),

    /// Object store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Metadata store failed.
    #[error("repository error: {0}")]
    Repository(String),

    /// Transform cache failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// A blocking worker panicked or was cancelled.
    #[error("worker task failed: {0}")]
    TaskJoin(String),
}

impl ImageError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Failure class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::FileTooLarge { .. }
            | Self::Processing(ProcessingError::OutputTooLarge { .. }) => ErrorKind::Validation,
            Self::ImageNotFound(_) | Self::ObjectNotFound { .. } => ErrorKind::NotFound,
            Self::Processing(_) => ErrorKind::Processing,
            Self::Storage(_) | Self::Repository(_) | Self::Cache(_) | Self::TaskJoin(_) => {
                ErrorKind::Adapter
            }
        }
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Validation(msg) => Self::Validation(msg),
            ImageError::FileTooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            ImageError::ImageNotFound(_) => Self::NotFound("Image not found".to_string()),
            ImageError::ObjectNotFound { .. } => {
                Self::NotFound("Image data not found".to_string())
            }
            ImageError::Processing(e @ ProcessingError::OutputTooLarge { .. }) => {
                Self::Validation(e.to_string())
            }
            ImageError::Processing(e) => Self::Processing(e.to_string()),
            ImageError::Storage(_)
            | ImageError::Repository(_)
            | ImageError::Cache(_)
            | ImageError::TaskJoin(_) => Self::Adapter(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ImageError::validation("bad"), ErrorKind::Validation, 400)]
    #[case(ImageError::FileTooLarge { size: 11, max: 10 }, ErrorKind::Validation, 413)]
    #[case(ImageError::ImageNotFound(ImageId::new()), ErrorKind::NotFound, 404)]
    #[case(
        ImageError::ObjectNotFound { image_id: ImageId::new(), key: "originals/x".to_string() },
        ErrorKind::NotFound,
        404
    )]
    #[case(ProcessingError::UnknownFormat.into(), ErrorKind::Processing, 500)]
    #[case(
        ProcessingError::OutputTooLarge { width: 4000, height: 16000 }.into(),
        ErrorKind::Validation,
        400
    )]
    #[case(StorageError::operation("timeout").into(), ErrorKind::Adapter, 500)]
    #[case(ImageError::repository("pool closed"), ErrorKind::Adapter, 500)]
    #[case(CacheError::Unavailable("down".to_string()).into(), ErrorKind::Adapter, 500)]
    #[case(ImageError::TaskJoin("panicked".to_string()), ErrorKind::Adapter, 500)]
    fn test_kind_and_status(
        #[case] err: ImageError,
        #[case] kind: ErrorKind,
        #[case] status: u16,
    ) {
        assert_eq!(err.kind(), kind);
        assert_eq!(AppError::from(err).status_code(), status);
    }

    #[test]
    fn test_kind_codes_are_stable() {
        assert_eq!(ErrorKind::Validation.as_str(), "validation_error");
        assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
        assert_eq!(ErrorKind::Processing.as_str(), "processing_error");
        assert_eq!(ErrorKind::Adapter.as_str(), "adapter_error");
    }

    #[test]
    fn test_not_found_variants_have_distinct_messages() {
        let missing_record = AppError::from(ImageError::ImageNotFound(ImageId::new()));
        let missing_object = AppError::from(ImageError::ObjectNotFound {
            image_id: ImageId::new(),
            key: "originals/a".to_string(),
        });

        assert_ne!(missing_record.public_message(), missing_object.public_message());
    }

    #[test]
    fn test_adapter_detail_hidden_from_clients() {
        let err = AppError::from(ImageError::repository("password=hunter2"));
        assert_eq!(err.public_message(), "An error occurred");
    }
}
