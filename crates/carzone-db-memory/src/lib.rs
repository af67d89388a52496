//! In-memory storage backend for CarZone.
//!
//! Implements the `EngineStorage` and `CarStorage` traits from
//! `carzone-storage` over two hash maps behind one lock. Behaviour matches
//! the PostgreSQL backend, which makes it suitable for local development and
//! for tests that should not need Docker.
//!
//! # Example
//!
//! ```ignore
//! use carzone_core::{EngineRequest, RequestContext};
//! use carzone_db_memory::InMemoryStorage;
//! use carzone_storage::EngineStorage;
//!
//! let storage = InMemoryStorage::new();
//! let engine = storage
//!     .create(&RequestContext::background(), &EngineRequest::new(2000, 4, 500))
//!     .await?;
//! ```

mod car_impl;
mod engine_impl;
mod storage;

pub use storage::InMemoryStorage;

pub use carzone_storage::{CarStorage, EngineStorage, StorageError};

use std::sync::Arc;

use carzone_cache::BrandCache;
use carzone_storage::{DynCarStorage, DynEngineStorage, EngineDeletePolicy};

/// Creates both stores over one shared set of tables.
pub fn create_memory_stores(
    cache: BrandCache,
    policy: EngineDeletePolicy,
) -> (DynEngineStorage, DynCarStorage) {
    let storage = Arc::new(InMemoryStorage::with_cache(cache).with_delete_policy(policy));
    let engines: DynEngineStorage = storage.clone();
    let cars: DynCarStorage = storage;
    (engines, cars)
}
