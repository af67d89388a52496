//! Process-wide owner of the database pool and the cache backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use carzone_cache::{BrandCache, BrandCacheConfig, CacheBackend, RedisConfig, create_cache_backend};
use carzone_storage::EngineDeletePolicy;

use crate::car::PostgresCarStore;
use crate::config::PostgresConfig;
use crate::engine::PostgresEngineStore;
use crate::error::Result;
use crate::{migrations, pool};

/// Holds the shared handles every store is built from.
///
/// Created once at startup and shut down once at exit. Clones share the same
/// pool, cache and closed flag.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    pool: PgPool,
    cache: CacheBackend,
    brand_cache: BrandCache,
    closed: Arc<AtomicBool>,
}

impl ConnectionManager {
    /// Connects to PostgreSQL and the cache.
    ///
    /// The database must answer within the configured startup budget. An
    /// unreachable cache is logged and tolerated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database stays unreachable or a migration
    /// fails.
    #[instrument(skip_all)]
    pub async fn initialize(
        postgres: &PostgresConfig,
        redis: &RedisConfig,
        cache: &BrandCacheConfig,
    ) -> Result<Self> {
        let pool = pool::connect_with_retry(postgres).await?;

        if postgres.run_migrations {
            migrations::run(&pool).await?;
        }

        let backend = create_cache_backend(redis).await;
        info!(
            cache_mode = %backend.stats().mode,
            brand_ttl_secs = cache.brand_ttl_secs,
            "Connection manager initialized"
        );

        Ok(Self::from_parts(pool, backend, cache))
    }

    /// Assembles a manager from handles that are already connected.
    #[must_use]
    pub fn from_parts(pool: PgPool, cache: CacheBackend, config: &BrandCacheConfig) -> Self {
        let brand_cache = BrandCache::new(cache.clone(), config);
        Self {
            pool,
            cache,
            brand_cache,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn cache(&self) -> &CacheBackend {
        &self.cache
    }

    pub fn brand_cache(&self) -> &BrandCache {
        &self.brand_cache
    }

    pub fn engine_store(&self, policy: EngineDeletePolicy) -> PostgresEngineStore {
        PostgresEngineStore::new(self.pool.clone(), self.brand_cache.clone())
            .with_delete_policy(policy)
    }

    pub fn car_store(&self) -> PostgresCarStore {
        PostgresCarStore::new(self.pool.clone(), self.brand_cache.clone())
    }

    /// Closes the pool. Only the first call does anything.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Closing PostgreSQL connection pool");
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
