//! Image service: upload, retrieval, deletion, and cache-first transformation.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use tracing::{debug, info, warn};

use prism_shared::types::{ImageId, PageRequest, PageResponse, UserId};

use super::engine::TransformEngine;
use super::error::ImageError;
use super::spec::{TransformSpec, cache_key};
use super::types::{
    CachedVariant, CreateImageInput, Image, ImageServiceConfig, StoredImage, TransformResult,
    UploadImageInput,
};
use crate::cache::TransformCache;
use crate::storage::{ObjectStore, keys};

/// Repository trait for image record persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait ImageRepository: Send + Sync {
    /// Create a new image record.
    fn create(
        &self,
        input: CreateImageInput,
    ) -> impl Future<Output = Result<Image, ImageError>> + Send;

    /// Find image by ID.
    fn find_by_id(
        &self,
        id: ImageId,
    ) -> impl Future<Output = Result<Option<Image>, ImageError>> + Send;

    /// List a user's images, newest first.
    fn list_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> impl Future<Output = Result<PageResponse<Image>, ImageError>> + Send;

    /// Delete image by ID. Returns `false` if there was nothing to delete.
    fn delete(&self, id: ImageId) -> impl Future<Output = Result<bool, ImageError>> + Send;
}

/// Image service coordinating object store, metadata store, and transform cache.
pub struct ImageService<S: ObjectStore, R: ImageRepository, C: TransformCache> {
    storage: Arc<S>,
    repo: Arc<R>,
    cache: Arc<C>,
    config: ImageServiceConfig,
}

impl<S, R, C> ImageService<S, R, C>
where
    S: ObjectStore,
    R: ImageRepository,
    C: TransformCache,
{
    /// Create a new image service.
    #[must_use]
    pub fn new(storage: Arc<S>, repo: Arc<R>, cache: Arc<C>, config: ImageServiceConfig) -> Self {
        Self {
            storage,
            repo,
            cache,
            config,
        }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ImageServiceConfig {
        &self.config
    }

    /// Returns a reference to `image_id` transformed by `spec`.
    ///
    /// A cached reference is returned without touching the metadata store,
    /// the object store, or the engine. On a miss the original is fetched and
    /// transformed on a blocking worker, the result is stored under a fresh
    /// derived key, and the reference is cached. Concurrent misses for the
    /// same key may each compute and store a variant.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The spec is empty or malformed
    /// - The image record or its original object does not exist
    /// - The engine fails
    /// - The object store or metadata store fails
    ///
    /// Cache failures are logged and never returned.
    pub async fn transform(
        &self,
        image_id: ImageId,
        spec: &TransformSpec,
    ) -> Result<TransformResult, ImageError> {
        if spec.is_empty() {
            return Err(ImageError::validation(
                "at least one transformation is required",
            ));
        }

        let normalized = spec.normalize()?;
        let key = cache_key(image_id, &normalized);

        if let Some(variant) = self.cached_variant(&key).await {
            debug!(image_id = %image_id, cache_key = %key, "Transform cache hit");
            return Ok(variant.into_result(true));
        }

        let image = self
            .repo
            .find_by_id(image_id)
            .await?
            .ok_or(ImageError::ImageNotFound(image_id))?;

        let original = self.load_original(&image).await?;

        let output =
            tokio::task::spawn_blocking(move || TransformEngine::apply(&original, &normalized))
                .await
                .map_err(|e| ImageError::TaskJoin(e.to_string()))??;

        let content_type = output.content_type();
        let derived_key = keys::derived_key(image_id, output.format.extension());
        self.storage
            .put(&derived_key, Bytes::from(output.data), content_type)
            .await?;

        let variant = CachedVariant {
            image_url: self.storage.object_url(&derived_key),
            content_type: content_type.to_string(),
        };
        self.store_variant(&key, &variant).await;

        info!(
            image_id = %image_id,
            cache_key = %key,
            derived_key = %derived_key,
            "Image transformed"
        );

        Ok(variant.into_result(false))
    }

    /// Store a new original and create its record.
    ///
    /// The stored content type is the one sniffed from the bytes, not the
    /// one the client declared.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file is empty, too large, or of a disallowed type
    /// - The bytes are not a decodable image
    /// - The object store or metadata store fails
    pub async fn upload(&self, input: UploadImageInput) -> Result<Image, ImageError> {
        let size = input.data.len() as u64;
        self.config.validate_upload(size, &input.content_type)?;

        let probe = TransformEngine::probe(&input.data)
            .map_err(|e| ImageError::validation(format!("invalid image: {e}")))?;

        let image_id = ImageId::new();
        let key = keys::original_key(input.user_id, image_id, &input.filename);
        let content_type = probe.format.content_type();

        self.storage
            .put(&key, input.data.clone(), content_type)
            .await?;

        let create = CreateImageInput {
            id: image_id,
            user_id: input.user_id,
            url: self.storage.object_url(&key),
            content_type: content_type.to_string(),
            file_size: i64::try_from(size).unwrap_or(i64::MAX),
            metadata: Some(json!({
                "filename": input.filename,
                "width": probe.width,
                "height": probe.height,
                "format": probe.format.as_str(),
            })),
        };

        match self.repo.create(create).await {
            Ok(image) => {
                info!(
                    image_id = %image.id,
                    user_id = %image.user_id,
                    size,
                    "Image uploaded"
                );
                Ok(image)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "Failed to remove orphaned upload");
                }
                Err(e)
            }
        }
    }

    /// Get an image record with the bytes of its original.
    ///
    /// # Errors
    ///
    /// Returns an error if the record or its object does not exist, or a store fails.
    pub async fn get(&self, image_id: ImageId) -> Result<StoredImage, ImageError> {
        let image = self
            .repo
            .find_by_id(image_id)
            .await?
            .ok_or(ImageError::ImageNotFound(image_id))?;

        let data = self.load_original(&image).await?;
        Ok(StoredImage { image, data })
    }

    /// Delete an image's original object and its record.
    ///
    /// The record is only removed once the original is gone, so a record
    /// whose object key cannot be derived from its URL is kept. Derived
    /// variants and their cache entries are left alone; cached references
    /// stay valid until they expire.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist, its object key cannot
    /// be derived, or a store fails.
    pub async fn delete(&self, image_id: ImageId) -> Result<(), ImageError> {
        let image = self
            .repo
            .find_by_id(image_id)
            .await?
            .ok_or(ImageError::ImageNotFound(image_id))?;

        let key = self.original_key(&image)?;
        match self.storage.delete(&key).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(image_id = %image_id, key = %key, "Original already gone");
            }
            Err(e) => return Err(e.into()),
        }

        if !self.repo.delete(image_id).await? {
            return Err(ImageError::ImageNotFound(image_id));
        }

        info!(image_id = %image_id, "Image deleted");
        Ok(())
    }

    /// List a user's images, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata store fails.
    pub async fn list(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<PageResponse<Image>, ImageError> {
        self.repo.list_by_user(user_id, page.normalized()).await
    }

    fn original_key(&self, image: &Image) -> Result<String, ImageError> {
        self.storage.key_from_url(&image.url).ok_or_else(|| {
            warn!(image_id = %image.id, url = %image.url, "Cannot derive object key from image URL");
            ImageError::ObjectNotFound {
                image_id: image.id,
                key: image.url.clone(),
            }
        })
    }

    async fn load_original(&self, image: &Image) -> Result<Bytes, ImageError> {
        let key = self.original_key(image)?;

        match self.storage.get(&key).await {
            Ok(data) => Ok(data),
            Err(e) if e.is_not_found() => {
                warn!(image_id = %image.id, key = %key, "Image record has no backing object");
                Err(ImageError::ObjectNotFound {
                    image_id: image.id,
                    key,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn cached_variant(&self, key: &str) -> Option<CachedVariant> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(variant) => Some(variant),
                Err(e) => {
                    warn!(cache_key = %key, error = %e, "Ignoring unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Transform cache read failed");
                None
            }
        }
    }

    async fn store_variant(&self, key: &str, variant: &CachedVariant) {
        let value = match serde_json::to_string(variant) {
            Ok(value) => value,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.cache.set(key, value, self.config.cache_ttl).await {
            warn!(cache_key = %key, error = %e, "Transform cache write failed");
        }
    }
}
