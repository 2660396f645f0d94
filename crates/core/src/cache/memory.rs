//! In-process transform cache using Moka.

use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;

use super::{CacheError, TransformCache};

/// Default cache capacity (number of entries).
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Expires every entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Bounded in-memory [`TransformCache`].
///
/// Thread-safe and cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct MemoryTransformCache {
    cache: Cache<String, Entry>,
}

impl MemoryTransformCache {
    /// Creates a cache holding at most `max_capacity` entries.
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache }
    }
}

impl Default for MemoryTransformCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl TransformCache for MemoryTransformCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.cache.insert(key.to_string(), Entry { value, ttl }).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = MemoryTransformCache::default();

        assert_eq!(cache.get("transform:a:none").await.unwrap(), None);

        cache
            .set("transform:a:none", "value".to_string(), HOUR)
            .await
            .unwrap();
        assert_eq!(
            cache.get("transform:a:none").await.unwrap().as_deref(),
            Some("value")
        );
    }

    #[tokio::test]
    async fn test_empty_value_is_present() {
        let cache = MemoryTransformCache::default();
        cache.set("k", String::new(), HOUR).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(String::new()));
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_ttl() {
        let cache = MemoryTransformCache::default();
        cache
            .set("short", "v".to_string(), Duration::from_millis(50))
            .await
            .unwrap();
        cache.set("long", "v".to_string(), HOUR).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.get("long").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let cache = MemoryTransformCache::new(2);
        for key in ["a", "b", "c", "d"] {
            cache.set(key, "v".to_string(), HOUR).await.unwrap();
        }

        cache.cache.run_pending_tasks().await;
        assert!(cache.cache.entry_count() <= 2);
    }
}
