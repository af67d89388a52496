//! Redis configuration and backend construction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backend::CacheBackend;

/// Redis configuration for the shared cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (gracefully degrades without it)
    /// Default: false (local cache for single-instance deployments)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Builds the cache backend described by `config`.
///
/// Never fails: a disabled or unbuildable Redis configuration yields the
/// local backend. A Redis server that is unreachable right now keeps the
/// Redis backend, so the cache starts working once the server is back, and
/// every read meanwhile is a miss.
pub async fn create_cache_backend(config: &RedisConfig) -> CacheBackend {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return CacheBackend::new_local();
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let timeout = Duration::from_millis(config.timeout_ms);
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return CacheBackend::new_local();
        }
    };

    let backend = CacheBackend::new_redis(pool);
    match backend.ping().await {
        Ok(()) => tracing::info!("Connected to Redis successfully"),
        Err(e) => tracing::warn!(
            error = %e,
            "Redis is unreachable; brand listings will be served from the database until it recovers"
        ),
    }

    backend
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RedisConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.timeout_ms, 5000);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RedisConfig =
            serde_json::from_str(r#"{"enabled": true, "url": "redis://cache:6380"}"#).unwrap();
        assert!(config.enabled);
        assert_eq!(config.url, "redis://cache:6380");
        assert_eq!(config.pool_size, 10);
    }

    #[tokio::test]
    async fn test_disabled_redis_uses_local_backend() {
        let backend = create_cache_backend(&RedisConfig::default()).await;
        assert_eq!(backend.stats().mode, "local");
    }

    #[tokio::test]
    async fn test_invalid_url_falls_back_to_local() {
        let config = RedisConfig {
            enabled: true,
            url: "not a redis url".into(),
            ..Default::default()
        };
        let backend = create_cache_backend(&config).await;
        assert_eq!(backend.stats().mode, "local");
    }

    #[tokio::test]
    async fn test_unreachable_server_keeps_redis_backend() {
        let config = RedisConfig {
            enabled: true,
            url: "redis://127.0.0.1:1".into(),
            timeout_ms: 200,
            ..Default::default()
        };
        let backend = create_cache_backend(&config).await;
        assert_eq!(backend.stats().mode, "redis");
        assert!(backend.ping().await.is_err());

        // Reads degrade to misses and writes to no-ops
        assert!(backend.get("Brand:Acme:flat").await.is_none());
        backend
            .set("Brand:Acme:flat", b"[]".to_vec(), Duration::from_secs(60))
            .await;
        backend.invalidate("Brand:Acme:flat").await;
        assert!(!backend.is_redis_available().await);
    }
}
