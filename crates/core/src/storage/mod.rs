//! Object storage for original and transformed images using Apache OpenDAL.
//!
//! Supported backends:
//! - S3-compatible: AWS S3, Cloudflare R2, MinIO, DigitalOcean Spaces
//! - Azure Blob Storage
//! - Local filesystem (development only)
//! - In-process memory (tests)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      ObjectStore trait                           │
//! │  put(key, bytes, type) │ get(key) │ delete(key) │ url <-> key    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                 StorageService (Apache OpenDAL)                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
pub mod keys;
mod service;

pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use service::{ObjectStore, StorageService};
