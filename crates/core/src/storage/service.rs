//! Object store adapter implemented on Apache OpenDAL.

use std::future::Future;

use bytes::Bytes;
use opendal::{Operator, services};
use tracing::debug;

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;

/// Byte-blob store addressed by key.
///
/// Implemented by [`StorageService`] for real backends; tests substitute
/// in-memory fakes.
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, replacing any existing object.
    fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Read the object stored under `key`.
    ///
    /// Fails with [`StorageError::NotFound`] if there is no such object.
    fn get(&self, key: &str) -> impl Future<Output = Result<Bytes, StorageError>> + Send;

    /// Delete the object stored under `key`. Deleting a missing object succeeds.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Public URL of the object stored under `key`.
    fn object_url(&self, key: &str) -> String;

    /// Inverse of [`ObjectStore::object_url`]; `None` for URLs this store does not own.
    fn key_from_url(&self, url: &str) -> Option<String>;
}

/// Storage service for image blobs.
#[derive(Debug, Clone)]
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::Memory => Operator::new(services::Memory::default())
                .map_err(|e| StorageError::configuration(e.to_string()))?
                .finish(),
        };

        Ok(operator)
    }

    /// Check if an object exists in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    pub async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.operator.stat(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::from_opendal(&e, key)),
        }
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

impl ObjectStore for StorageService {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }

        let size = data.len();
        // Fs and Memory reject content-type hints instead of ignoring them.
        let result = if self
            .operator
            .info()
            .full_capability()
            .write_with_content_type
        {
            self.operator
                .write_with(key, data)
                .content_type(content_type)
                .await
        } else {
            self.operator.write(key, data).await
        };
        result.map_err(|e| StorageError::from_opendal(&e, key))?;

        debug!(key, size, content_type, "Object stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let buffer = self
            .operator
            .read(key)
            .await
            .map_err(|e| StorageError::from_opendal(&e, key))?;

        Ok(buffer.to_bytes())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator
            .delete(key)
            .await
            .map_err(|e| StorageError::from_opendal(&e, key))
    }

    fn object_url(&self, key: &str) -> String {
        self.config.object_url(key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        self.config.key_from_url(url)
    }
}
