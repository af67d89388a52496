//! Table storage for the in-memory backend.
//!
//! Engines and cars live in two maps behind one lock; the trait
//! implementations are in `engine_impl` and `car_impl`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use carzone_cache::BrandCache;
use carzone_core::{Car, CarProjection, Engine};
use carzone_storage::EngineDeletePolicy;

/// A stored car and its insertion sequence number.
#[derive(Debug, Clone)]
pub(crate) struct CarRecord {
    pub(crate) seq: u64,
    pub(crate) car: Car,
}

/// Both tables. Every operation holds the lock for its whole duration, so a
/// write either applies completely or not at all.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) engines: HashMap<Uuid, Engine>,
    pub(crate) cars: HashMap<Uuid, CarRecord>,
    next_seq: u64,
}

impl Tables {
    pub(crate) fn insert_car(&mut self, car: Car) {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.cars.insert(car.id, CarRecord { seq, car });
    }

    /// A copy of `car` with its engine attached, as a joined query returns it.
    pub(crate) fn with_engine(&self, car: &Car) -> Car {
        let mut car = car.clone();
        car.engine = car.engine_id.and_then(|id| self.engines.get(&id).cloned());
        car
    }

    pub(crate) fn cars_by_brand(&self, brand: &str, projection: CarProjection) -> Vec<Car> {
        let mut records: Vec<&CarRecord> = self
            .cars
            .values()
            .filter(|record| record.car.brand == brand)
            .collect();
        records.sort_by_key(|record| record.seq);

        records
            .into_iter()
            .map(|record| match projection {
                CarProjection::WithEngine => self.with_engine(&record.car),
                CarProjection::Flat => record.car.clone(),
            })
            .collect()
    }

    pub(crate) fn cars_of_engine(&self, engine_id: Uuid) -> impl Iterator<Item = &Car> {
        self.cars
            .values()
            .map(|record| &record.car)
            .filter(move |car| car.engine_id == Some(engine_id))
    }

    pub(crate) fn cars_of_engine_mut(&mut self, engine_id: Uuid) -> impl Iterator<Item = &mut Car> {
        self.cars
            .values_mut()
            .map(|record| &mut record.car)
            .filter(move |car| car.engine_id == Some(engine_id))
    }
}

/// In-memory car and engine storage.
///
/// Implements both [`EngineStorage`](carzone_storage::EngineStorage) and
/// [`CarStorage`](carzone_storage::CarStorage) with the same error kinds,
/// cache handling and delete policy as the PostgreSQL backend. Clones share
/// the same tables.
#[derive(Debug, Clone)]
pub struct InMemoryStorage {
    pub(crate) tables: Arc<RwLock<Tables>>,
    pub(crate) cache: BrandCache,
    pub(crate) delete_policy: EngineDeletePolicy,
}

impl InMemoryStorage {
    /// Creates an empty storage with a local brand cache and the default
    /// delete policy.
    pub fn new() -> Self {
        Self::with_cache(BrandCache::local())
    }

    pub fn with_cache(cache: BrandCache) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            cache,
            delete_policy: EngineDeletePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_delete_policy(mut self, policy: EngineDeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn cache(&self) -> &BrandCache {
        &self.cache
    }

    pub fn delete_policy(&self) -> EngineDeletePolicy {
        self.delete_policy
    }

    pub async fn engine_count(&self) -> usize {
        self.tables.read().await.engines.len()
    }

    pub async fn car_count(&self) -> usize {
        self.tables.read().await.cars.len()
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}
