//! Image pipeline.
//!
//! This module provides:
//! - Upload validation and storage of originals
//! - Transformation specs and their canonical cache keys
//! - The transformation engine
//! - Cache-first transformation of stored images

mod engine;
mod error;
mod service;
mod spec;
mod types;


pub use engine::{ImageInfo, TransformEngine, TransformOutput};
pub use error::{ErrorKind, ImageError, ProcessingError};
pub use service::{ImageRepository, ImageService};
pub use spec::{
    MAX_DIMENSION, NormalizedSpec, OutputFormat, Resize, ResizeSpec, Rotation, TransformSpec,
    cache_key,
};
pub use types::{
    ALLOWED_MIME_TYPES, CachedVariant, CreateImageInput, DEFAULT_CACHE_TTL, DEFAULT_MAX_FILE_SIZE,
    Image, ImageServiceConfig, StoredImage, TransformResult, UploadImageInput,
};
