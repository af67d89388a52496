//! Brand listing cache for CarZone.
//!
//! ## Architecture
//!
//! - [`CacheBackend::Local`]: in-process map, single instance only
//! - [`CacheBackend::Redis`]: shared across instances through a connection pool
//! - [`BrandCache`]: typed view used by the car stores (keys, TTL, JSON codec)
//!
//! ## Graceful Degradation
//!
//! The cache is a disposable projection of the relational store. Every
//! backend failure is logged and reported as a miss or a no-op, so a store
//! operation never fails because of the cache.

mod backend;
mod brand;
mod config;
mod error;

pub use backend::{CacheBackend, CacheStats, CachedEntry, LOCAL_SWEEP_INTERVAL, LocalStore};
pub use brand::{BrandCache, BrandCacheConfig, CacheLookup};
pub use config::{RedisConfig, create_cache_backend};
pub use error::CacheError;
