//! Storage configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use prism_shared::StorageSettings;

use super::error::StorageError;

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage: AWS S3, Cloudflare R2, MinIO, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Azure container name.
        container: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
    /// In-process memory (tests and throwaway runs)
    Memory,
}

impl StorageProvider {
    /// Create S3-compatible provider.
    #[must_use]
    pub fn s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Create Azure Blob Storage provider.
    #[must_use]
    pub fn azure_blob(
        account: impl Into<String>,
        access_key: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self::AzureBlob {
            account: account.into(),
            access_key: access_key.into(),
            container: container.into(),
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Build a provider from raw configuration settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the provider is unknown or a
    /// required field for it is missing.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        fn required(value: Option<&String>, field: &str) -> Result<String, StorageError> {
            value
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| StorageError::configuration(format!("storage.{field} is required")))
        }

        match settings.provider.as_str() {
            "s3" => {
                let region = required(settings.region.as_ref(), "region")?;
                let endpoint = settings
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| format!("https://s3.{region}.amazonaws.com"));
                Ok(Self::s3(
                    endpoint,
                    required(settings.bucket.as_ref(), "bucket")?,
                    required(settings.access_key_id.as_ref(), "access_key_id")?,
                    required(settings.secret_access_key.as_ref(), "secret_access_key")?,
                    region,
                ))
            }
            "azure_blob" => Ok(Self::azure_blob(
                required(settings.account.as_ref(), "account")?,
                required(settings.access_key.as_ref(), "access_key")?,
                required(settings.container.as_ref(), "container")?,
            )),
            "local" => Ok(Self::local_fs(required(settings.root.as_ref(), "root")?)),
            "memory" => Ok(Self::Memory),
            other => Err(StorageError::configuration(format!(
                "unknown storage provider '{other}'"
            ))),
        }
    }

    /// Get the provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
            Self::LocalFs { .. } => "local",
            Self::Memory => "memory",
        }
    }

    /// Base URL under which objects of this provider are publicly addressed.
    #[must_use]
    pub fn default_public_base_url(&self) -> String {
        match self {
            Self::S3 {
                endpoint,
                bucket,
                region,
                ..
            } => {
                if endpoint.contains("amazonaws.com") {
                    format!("https://{bucket}.s3.{region}.amazonaws.com")
                } else {
                    format!("{}/{bucket}", endpoint.trim_end_matches('/'))
                }
            }
            Self::AzureBlob {
                account, container, ..
            } => format!("https://{account}.blob.core.windows.net/{container}"),
            Self::LocalFs { root } => format!("file://{}", root.display()),
            Self::Memory => "memory://prism".to_string(),
        }
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Base URL that object keys are appended to. Never ends with `/`.
    pub public_base_url: String,
}

impl StorageConfig {
    /// Create a new storage config with the provider's default public URL.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        let public_base_url = provider.default_public_base_url();
        Self {
            provider,
            public_base_url,
        }
    }

    /// Override the public base URL.
    #[must_use]
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build a storage config from raw configuration settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the provider settings are invalid.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let config = Self::new(StorageProvider::from_settings(settings)?);
        Ok(match &settings.public_base_url {
            Some(url) if !url.is_empty() => config.with_public_base_url(url.clone()),
            _ => config,
        })
    }

    /// Public URL of the object stored under `key`.
    #[must_use]
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Object key addressed by a public URL, if the URL belongs to this store.
    #[must_use]
    pub fn key_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
            .map(String::from)
    }
}
