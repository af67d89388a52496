//! Builds the stores for the configured backend.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use carzone_cache::{BrandCache, create_cache_backend};
use carzone_db_memory::create_memory_stores;
use carzone_db_postgres::ConnectionManager;
use carzone_storage::{DynCarStorage, DynEngineStorage};

use crate::config::{AppConfig, StorageBackend};

/// The engine and car stores plus whatever owns their connections.
pub struct Stores {
    pub engines: DynEngineStorage,
    pub cars: DynCarStorage,
    connections: Option<ConnectionManager>,
}

impl Stores {
    /// Connects the configured backend and builds both stores on it.
    ///
    /// # Errors
    ///
    /// Fails if PostgreSQL stays unreachable for the whole startup budget
    /// or a migration fails.
    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let policy = cfg.storage.engine_delete_policy;

        match cfg.storage.backend {
            StorageBackend::Postgres => {
                let manager = ConnectionManager::initialize(&cfg.postgres, &cfg.redis, &cfg.cache)
                    .await
                    .context("PostgreSQL initialization failed")?;
                let engines: DynEngineStorage = Arc::new(manager.engine_store(policy));
                let cars: DynCarStorage = Arc::new(manager.car_store());
                Ok(Self {
                    engines,
                    cars,
                    connections: Some(manager),
                })
            }
            StorageBackend::Memory => {
                let cache = BrandCache::new(create_cache_backend(&cfg.redis).await, &cfg.cache);
                let (engines, cars) = create_memory_stores(cache, policy);
                info!("Using in-memory storage; data is lost on exit");
                Ok(Self {
                    engines,
                    cars,
                    connections: None,
                })
            }
        }
    }

    pub fn connections(&self) -> Option<&ConnectionManager> {
        self.connections.as_ref()
    }

    /// Releases the database pool, if any. Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Some(manager) = &self.connections {
            manager.shutdown().await;
        }
    }
}
