//! Image domain types.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use prism_shared::types::{ImageId, UserId};

use super::error::ImageError;

/// Default maximum upload size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default lifetime of a transform cache entry (1 hour).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Allowed MIME types for uploads.
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Stored image record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Image ID.
    pub id: ImageId,
    /// Owner.
    pub user_id: UserId,
    /// Public URL of the original object.
    #[serde(rename = "imageUrl")]
    pub url: String,
    /// MIME type of the original.
    pub content_type: String,
    /// Size of the original in bytes.
    pub file_size: i64,
    /// Free-form metadata captured at upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an image record.
#[derive(Debug, Clone)]
pub struct CreateImageInput {
    /// Image ID, assigned before the original is stored.
    pub id: ImageId,
    /// Owner.
    pub user_id: UserId,
    /// Public URL of the original object.
    pub url: String,
    /// MIME type.
    pub content_type: String,
    /// File size in bytes.
    pub file_size: i64,
    /// Metadata.
    pub metadata: Option<Value>,
}

/// An upload as received from the transport.
#[derive(Debug, Clone)]
pub struct UploadImageInput {
    /// Owner.
    pub user_id: UserId,
    /// Client-supplied file name.
    pub filename: String,
    /// Client-declared MIME type.
    pub content_type: String,
    /// Raw file bytes.
    pub data: Bytes,
}

/// Reference to a transformed variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    /// Public URL of the derived object.
    pub image_url: String,
    /// MIME type of the derived object.
    pub content_type: String,
    /// Whether the reference came from the cache.
    pub cached: bool,
}

/// Cache value for a transformed variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedVariant {
    /// Public URL of the derived object.
    pub image_url: String,
    /// MIME type of the derived object.
    pub content_type: String,
}

impl CachedVariant {
    /// Converts into a result, flagging whether it was served from cache.
    #[must_use]
    pub fn into_result(self, cached: bool) -> TransformResult {
        TransformResult {
            image_url: self.image_url,
            content_type: self.content_type,
            cached,
        }
    }
}

/// A record together with the bytes of its original.
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Image record.
    pub image: Image,
    /// Original bytes.
    pub data: Bytes,
}

/// Image service configuration.
#[derive(Debug, Clone)]
pub struct ImageServiceConfig {
    /// Lifetime of transform cache entries.
    pub cache_ttl: Duration,
    /// Maximum upload size in bytes.
    pub max_file_size: u64,
    /// Accepted upload MIME types.
    pub allowed_mime_types: Vec<String>,
}

impl Default for ImageServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_mime_types: ALLOWED_MIME_TYPES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl ImageServiceConfig {
    /// Check if a MIME type is allowed.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        self.allowed_mime_types.iter().any(|m| *m == mime_type)
    }

    /// Validate upload size and declared type.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is empty or too large, or the MIME type is not allowed.
    pub fn validate_upload(&self, file_size: u64, content_type: &str) -> Result<(), ImageError> {
        if file_size == 0 {
            return Err(ImageError::validation("file is empty"));
        }

        if file_size > self.max_file_size {
            return Err(ImageError::FileTooLarge {
                size: file_size,
                max: self.max_file_size,
            });
        }

        if !self.is_mime_type_allowed(content_type) {
            return Err(ImageError::validation(format!(
                "unsupported file type '{content_type}'"
            )));
        }

        Ok(())
    }
}
