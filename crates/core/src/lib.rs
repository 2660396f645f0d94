//! Core image pipeline for Prism.
//!
//! This crate contains the pipeline logic with ZERO web or database dependencies.
//! Adapters for the object store and the transform cache live here behind
//! traits; the metadata store is reached through [`image::ImageRepository`],
//! implemented by the db crate.
//!
//! # Modules
//!
//! - `storage` - Object store adapter (OpenDAL) and key layout
//! - `cache` - Transform cache adapter (Moka)
//! - `image` - Transformation specs, engine, and the image service

pub mod cache;
pub mod image;
pub mod storage;

pub use cache::{CacheError, MemoryTransformCache, TransformCache};
pub use image::{ImageError, ImageRepository, ImageService};
pub use storage::{ObjectStore, StorageError, StorageService};
