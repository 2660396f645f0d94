//! Transform cache: short-lived string entries keyed by canonical transform key.
//!
//! The orchestrator stores a serialized reference to each derived object here
//! so repeated identical transformations skip the engine entirely.

mod error;
mod memory;

use std::future::Future;
use std::time::Duration;

pub use error::CacheError;
pub use memory::MemoryTransformCache;

/// Key-value cache with per-entry TTL.
///
/// `Ok(None)` means the key is absent or expired. An empty string is a
/// present value.
pub trait TransformCache: Send + Sync {
    /// Look up the value stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, CacheError>> + Send;

    /// Store `value` under `key`, expiring after `ttl`.
    fn set(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;
}
