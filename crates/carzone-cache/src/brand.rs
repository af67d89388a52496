//! Typed cache for brand listings.
//!
//! Entries are keyed by brand and projection, so a listing cached without
//! engines is never served to a caller that asked for them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use carzone_core::{Car, CarProjection};

use crate::backend::CacheBackend;

/// Brand cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandCacheConfig {
    /// Whether brand listings are cached at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Freshness window of a cached listing, in seconds.
    #[serde(default = "default_brand_ttl_secs")]
    pub brand_ttl_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_brand_ttl_secs() -> u64 {
    60
}

impl Default for BrandCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            brand_ttl_secs: default_brand_ttl_secs(),
        }
    }
}

impl BrandCacheConfig {
    pub fn brand_ttl(&self) -> Duration {
        Duration::from_secs(self.brand_ttl_secs)
    }
}

/// Outcome of a cache lookup. A miss is a normal control-flow signal.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Vec<Car>),
    Miss,
}

/// Read-through cache for `get_by_brand`, shared by every car store.
#[derive(Debug, Clone)]
pub struct BrandCache {
    backend: CacheBackend,
    ttl: Duration,
    enabled: bool,
}

impl BrandCache {
    pub fn new(backend: CacheBackend, config: &BrandCacheConfig) -> Self {
        Self {
            backend,
            ttl: config.brand_ttl(),
            enabled: config.enabled,
        }
    }

    /// A cache over a fresh local backend with default settings.
    pub fn local() -> Self {
        Self::new(CacheBackend::new_local(), &BrandCacheConfig::default())
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(
            CacheBackend::new_local(),
            &BrandCacheConfig {
                enabled: false,
                ..Default::default()
            },
        )
    }

    pub fn key(brand: &str, projection: CarProjection) -> String {
        format!("Brand:{brand}:{projection}")
    }

    pub fn backend(&self) -> &CacheBackend {
        &self.backend
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn lookup(&self, brand: &str, projection: CarProjection) -> CacheLookup {
        if !self.enabled {
            return CacheLookup::Miss;
        }
        let key = Self::key(brand, projection);
        let Some(data) = self.backend.get(&key).await else {
            return CacheLookup::Miss;
        };
        match serde_json::from_slice::<Vec<Car>>(&data) {
            Ok(cars) => CacheLookup::Hit(cars),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                CacheLookup::Miss
            }
        }
    }

    pub async fn store(&self, brand: &str, projection: CarProjection, cars: &[Car]) {
        if !self.enabled {
            return;
        }
        let key = Self::key(brand, projection);
        match serde_json::to_vec(cars) {
            Ok(data) => self.backend.set(&key, data, self.ttl).await,
            Err(e) => tracing::warn!(key = %key, error = %e, "Cannot encode brand listing for cache"),
        }
    }

    /// Drops every cached projection of `brand`.
    pub async fn invalidate_brand(&self, brand: &str) {
        if !self.enabled {
            return;
        }
        for projection in CarProjection::all() {
            self.backend.invalidate(&Self::key(brand, projection)).await;
        }
    }

    /// Drops every cached projection of each distinct brand in `brands`.
    pub async fn invalidate_brands<'a, I>(&self, brands: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen: Vec<&str> = Vec::new();
        for brand in brands {
            if !seen.contains(&brand) {
                seen.push(brand);
                self.invalidate_brand(brand).await;
            }
        }
    }
}
