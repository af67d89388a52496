//! Cache backend implementation: in-process map or Redis.

use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::error::CacheError;

/// A cached entry with TTL support.
///
/// The data is wrapped in `Arc` so that hits hand out the payload without
/// copying potentially large listings.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    /// Create a new cached entry.
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Local writes between two sweeps of expired entries.
pub const LOCAL_SWEEP_INTERVAL: usize = 256;

/// Entries of the local backend plus the write counter that paces sweeps.
#[derive(Debug, Default)]
pub struct LocalStore {
    entries: DashMap<String, CachedEntry>,
    writes: AtomicUsize,
}

impl LocalStore {
    /// Drops every expired entry and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            if entry.is_expired() {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    fn insert(&self, key: &str, entry: CachedEntry) {
        self.entries.insert(key.to_string(), entry);
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % LOCAL_SWEEP_INTERVAL == 0 {
            let removed = self.cleanup_expired();
            if removed > 0 {
                tracing::debug!(removed, "swept expired local cache entries");
            }
        }
    }

    fn live_entries(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.is_expired()).count()
    }
}

/// Key-value cache backend.
///
/// ## Cache Modes
///
/// - **Local**: single-instance mode, entries live in a `DashMap`. Expired
///   entries are dropped when read and swept every [`LOCAL_SWEEP_INTERVAL`]
///   writes; there is no background task.
/// - **Redis**: multi-instance mode, entries live in Redis only so that an
///   invalidation on one instance is visible to all of them
///
/// All Redis commands are awaited inline. Failures are logged and reported
/// as a miss (reads) or ignored (writes and deletes).
#[derive(Clone)]
pub enum CacheBackend {
    /// Single-instance: local DashMap only
    Local(Arc<LocalStore>),

    /// Multi-instance: Redis through a connection pool
    Redis(Pool),
}

impl CacheBackend {
    /// Create a new local-only cache backend.
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(LocalStore::default()))
    }

    /// Create a new Redis-backed cache backend.
    pub fn new_redis(redis_pool: Pool) -> Self {
        CacheBackend::Redis(redis_pool)
    }

    /// Get a value from the cache.
    ///
    /// Returns `None` on a miss, on an expired entry and on any Redis error.
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        match self {
            CacheBackend::Local(store) => {
                if let Some(entry) = store.entries.get(key)
                    && !entry.is_expired()
                {
                    tracing::debug!(key = %key, "cache hit (local)");
                    return Some(Arc::clone(&entry.data));
                }
                // Re-checked under the shard lock so a fresh concurrent set survives
                store.entries.remove_if(key, |_, entry| entry.is_expired());
                tracing::debug!(key = %key, "cache miss (local)");
                None
            }
            CacheBackend::Redis(redis) => match redis.get().await {
                Ok(mut conn) => match conn.get::<_, Option<Vec<u8>>>(key).await {
                    Ok(Some(data)) => {
                        tracing::debug!(key = %key, "cache hit (redis)");
                        Some(Arc::new(data))
                    }
                    Ok(None) => {
                        tracing::debug!(key = %key, "cache miss (redis)");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Redis GET error");
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to get Redis connection");
                    None
                }
            },
        }
    }

    /// Set a value in the cache with TTL.
    ///
    /// Redis rounds the TTL down to whole seconds with a floor of one second.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        match self {
            CacheBackend::Local(store) => {
                store.insert(key, CachedEntry::new(value, ttl));
                tracing::debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "cache set (local)");
            }
            CacheBackend::Redis(redis) => {
                let ttl_secs = ttl.as_secs().max(1);
                match redis.get().await {
                    Ok(mut conn) => {
                        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
                            tracing::warn!(key = %key, error = %e, "Redis SET error");
                        } else {
                            tracing::debug!(key = %key, ttl_secs = %ttl_secs, "cache set (redis)");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Failed to get Redis connection");
                    }
                }
            }
        }
    }

    /// Invalidate a cache entry.
    pub async fn invalidate(&self, key: &str) {
        match self {
            CacheBackend::Local(store) => {
                store.entries.remove(key);
                tracing::debug!(key = %key, "cache invalidated (local)");
            }
            CacheBackend::Redis(redis) => match redis.get().await {
                Ok(mut conn) => {
                    if let Err(e) = conn.del::<_, ()>(key).await {
                        tracing::warn!(key = %key, error = %e, "Redis DEL error");
                    } else {
                        tracing::debug!(key = %key, "cache invalidated (redis)");
                    }
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to get Redis connection");
                }
            },
        }
    }

    /// Probe the backend. The local backend is always reachable.
    pub async fn ping(&self) -> Result<(), CacheError> {
        match self {
            CacheBackend::Local(_) => Ok(()),
            CacheBackend::Redis(redis) => {
                let mut conn = redis.get().await?;
                let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
                Ok(())
            }
        }
    }

    /// Sweeps expired local entries. Redis expires keys itself, so this is
    /// a no-op there.
    pub fn cleanup_expired(&self) -> usize {
        match self {
            CacheBackend::Local(store) => store.cleanup_expired(),
            CacheBackend::Redis(_) => 0,
        }
    }

    /// Get cache statistics. `local_entries` counts unexpired entries only.
    pub fn stats(&self) -> CacheStats {
        match self {
            CacheBackend::Local(store) => CacheStats {
                local_entries: store.live_entries(),
                mode: "local".to_string(),
            },
            CacheBackend::Redis(_) => CacheStats {
                local_entries: 0,
                mode: "redis".to_string(),
            },
        }
    }

    /// Check if Redis is available (for health checks).
    pub async fn is_redis_available(&self) -> bool {
        match self {
            CacheBackend::Local(_) => false,
            CacheBackend::Redis(_) => self.ping().await.is_ok(),
        }
    }
}

impl std::fmt::Debug for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackend::Local(store) => f
                .debug_struct("CacheBackend::Local")
                .field("entries", &store.entries.len())
                .finish(),
            CacheBackend::Redis(pool) => f
                .debug_struct("CacheBackend::Redis")
                .field("status", &pool.status())
                .finish(),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub local_entries: usize,
    pub mode: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_cache_get_set() {
        let cache = CacheBackend::new_local();

        cache
            .set("test_key", b"test_value".to_vec(), Duration::from_secs(60))
            .await;

        let value = cache.get("test_key").await;
        assert_eq!(value, Some(Arc::new(b"test_value".to_vec())));

        let stats = cache.stats();
        assert_eq!(stats.mode, "local");
        assert_eq!(stats.local_entries, 1);
    }

    #[tokio::test]
    async fn test_local_cache_expiration() {
        let cache = CacheBackend::new_local();

        cache
            .set(
                "expiring_key",
                b"value".to_vec(),
                Duration::from_millis(50),
            )
            .await;
        assert!(cache.get("expiring_key").await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get("expiring_key").await.is_none());
        assert_eq!(cache.stats().local_entries, 0);
    }

    #[tokio::test]
    async fn test_local_cache_invalidate() {
        let cache = CacheBackend::new_local();

        cache
            .set("key", b"value".to_vec(), Duration::from_secs(60))
            .await;
        cache.invalidate("key").await;

        assert!(cache.get("key").await.is_none());
        // Invalidating a missing key is a no-op
        cache.invalidate("key").await;
    }

    #[tokio::test]
    async fn test_local_cache_overwrite() {
        let cache = CacheBackend::new_local();

        cache.set("key", b"one".to_vec(), Duration::from_secs(60)).await;
        cache.set("key", b"two".to_vec(), Duration::from_secs(60)).await;

        assert_eq!(cache.get("key").await, Some(Arc::new(b"two".to_vec())));
    }

    #[tokio::test]
    async fn test_local_cache_is_always_reachable() {
        let cache = CacheBackend::new_local();
        assert!(cache.ping().await.is_ok());
        assert!(!cache.is_redis_available().await);
    }

    #[tokio::test]
    async fn test_expired_entries_do_not_accumulate() {
        let cache = CacheBackend::new_local();
        for i in 0..1000 {
            cache
                .set(&format!("Brand:b{i}:flat"), b"[]".to_vec(), Duration::from_millis(300))
                .await;
        }
        assert_eq!(cache.stats().local_entries, 1000);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(cache.stats().local_entries, 0);

        // Writes keep sweeping without any reads of the expired keys
        for i in 0..LOCAL_SWEEP_INTERVAL {
            cache
                .set(&format!("Brand:fresh{i}:flat"), b"[]".to_vec(), Duration::from_secs(60))
                .await;
        }
        let CacheBackend::Local(store) = &cache else {
            panic!("expected local backend");
        };
        assert_eq!(store.entries.len(), LOCAL_SWEEP_INTERVAL);
        assert_eq!(cache.cleanup_expired(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_expired_reports_removed_count() {
        let cache = CacheBackend::new_local();
        cache.set("short", b"a".to_vec(), Duration::from_millis(10)).await;
        cache.set("long", b"b".to_vec(), Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.cleanup_expired(), 1);
        assert!(cache.get("long").await.is_some());
    }

    #[tokio::test]
    async fn test_expired_read_keeps_fresh_replacement() {
        let cache = CacheBackend::new_local();
        cache.set("key", b"old".to_vec(), Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        cache.set("key", b"new".to_vec(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("key").await, Some(Arc::new(b"new".to_vec())));
    }
}
