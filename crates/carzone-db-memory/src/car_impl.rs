//! `CarStorage` implementation for `InMemoryStorage`.

use async_trait::async_trait;
use tracing::debug;

use carzone_cache::CacheLookup;
use carzone_core::{Car, CarProjection, CarRequest, RequestContext, generate_id, now_utc, parse_id};
use carzone_storage::{CAR_ENTITY, CarStorage, StorageError};

use crate::storage::InMemoryStorage;

fn missing_engine(request: &CarRequest) -> StorageError {
    StorageError::constraint_violation(format!("engine {} does not exist", request.engine_id))
}

#[async_trait]
impl CarStorage for InMemoryStorage {
    async fn get_by_id(&self, ctx: &RequestContext, id: &str) -> Result<Car, StorageError> {
        let car_id = parse_id(id).map_err(|_| StorageError::not_found(CAR_ENTITY, id))?;
        ctx.run(async {
            let tables = self.tables.read().await;
            tables
                .cars
                .get(&car_id)
                .map(|record| tables.with_engine(&record.car))
                .ok_or_else(|| StorageError::not_found(CAR_ENTITY, id))
        })
        .await
    }

    async fn get_by_brand(
        &self,
        ctx: &RequestContext,
        brand: &str,
        include_engine: bool,
    ) -> Result<Vec<Car>, StorageError> {
        let projection = CarProjection::from_include_engine(include_engine);

        let lookup = ctx
            .run(async { Ok::<_, StorageError>(self.cache.lookup(brand, projection).await) })
            .await?;
        if let CacheLookup::Hit(cars) = lookup {
            debug!(brand = %brand, projection = %projection, "Brand cache hit");
            return Ok(cars);
        }
        debug!(brand = %brand, projection = %projection, "Brand cache miss");

        let cars = ctx
            .run(async {
                let tables = self.tables.read().await;
                Ok::<_, StorageError>(tables.cars_by_brand(brand, projection))
            })
            .await?;
        self.cache.store(brand, projection, &cars).await;
        Ok(cars)
    }

    async fn create(&self, ctx: &RequestContext, request: &CarRequest) -> Result<Car, StorageError> {
        request.validate()?;
        let now = now_utc();
        let car = Car {
            id: generate_id(),
            name: request.name.clone(),
            year: request.year.clone(),
            brand: request.brand.clone(),
            fuel_type: request.fuel_type.clone(),
            engine_id: Some(request.engine_id),
            engine: None,
            price: request.price,
            created_at: now,
            updated_at: now,
        };

        let created = ctx
            .run(async {
                let mut tables = self.tables.write().await;
                if !tables.engines.contains_key(&request.engine_id) {
                    return Err(missing_engine(request));
                }
                tables.insert_car(car.clone());
                Ok(tables.with_engine(&car))
            })
            .await?;

        self.cache.invalidate_brand(&created.brand).await;

        debug!(car_id = %created.id, brand = %created.brand, "Car created");
        Ok(created)
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: &CarRequest,
    ) -> Result<Car, StorageError> {
        request.validate()?;
        let car_id = parse_id(id).map_err(|_| StorageError::no_rows_affected(CAR_ENTITY, id))?;

        let (updated, previous_brand) = ctx
            .run(async {
                let mut tables = self.tables.write().await;
                if !tables.cars.contains_key(&car_id) {
                    return Err(StorageError::no_rows_affected(CAR_ENTITY, id));
                }
                if !tables.engines.contains_key(&request.engine_id) {
                    return Err(missing_engine(request));
                }

                let Some(record) = tables.cars.get_mut(&car_id) else {
                    return Err(StorageError::no_rows_affected(CAR_ENTITY, id));
                };
                let car = &mut record.car;
                let previous_brand = std::mem::replace(&mut car.brand, request.brand.clone());
                car.name = request.name.clone();
                car.year = request.year.clone();
                car.fuel_type = request.fuel_type.clone();
                car.engine_id = Some(request.engine_id);
                car.price = request.price;
                car.updated_at = now_utc();

                let car = car.clone();
                Ok((tables.with_engine(&car), previous_brand))
            })
            .await?;

        self.cache
            .invalidate_brands([previous_brand.as_str(), updated.brand.as_str()])
            .await;

        debug!(car_id = %updated.id, brand = %updated.brand, "Car updated");
        Ok(updated)
    }

    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<Car, StorageError> {
        let car_id = parse_id(id).map_err(|_| StorageError::not_found(CAR_ENTITY, id))?;

        let deleted = ctx
            .run(async {
                let mut tables = self.tables.write().await;
                let record = tables
                    .cars
                    .remove(&car_id)
                    .ok_or_else(|| StorageError::not_found(CAR_ENTITY, id))?;
                Ok::<_, StorageError>(tables.with_engine(&record.car))
            })
            .await?;

        self.cache.invalidate_brand(&deleted.brand).await;

        debug!(car_id = %deleted.id, brand = %deleted.brand, "Car deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carzone_cache::BrandCache;
    use carzone_core::{Engine, EngineRequest};
    use carzone_storage::EngineStorage;
    use futures_util::future::join_all;
    use uuid::Uuid;

    fn cars(storage: &InMemoryStorage) -> &dyn CarStorage {
        storage
    }

    async fn engine(storage: &InMemoryStorage) -> Engine {
        EngineStorage::create(
            storage,
            &RequestContext::background(),
            &EngineRequest::new(2000, 4, 500),
        )
        .await
        .unwrap()
    }

    fn request(brand: &str, engine_id: Uuid) -> CarRequest {
        CarRequest {
            name: "Model X".into(),
            year: "2020".into(),
            brand: brand.into(),
            fuel_type: "Petrol".into(),
            engine_id,
            price: 25000.0,
        }
    }

    #[tokio::test]
    async fn test_create_get_delete_scenario() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let engine = engine(&storage).await;

        let car = cars(&storage)
            .create(&ctx, &request("Acme", engine.engine_id))
            .await
            .unwrap();
        assert!(!car.id.is_nil());
        assert_eq!(car.created_at, car.updated_at);
        assert_eq!(car.engine.as_ref(), Some(&engine));

        let id = car.id.to_string();
        let fetched = cars(&storage).get_by_id(&ctx, &id).await.unwrap();
        assert_eq!(fetched, car);
        assert_eq!(fetched.engine.map(|e| e.engine_id), Some(engine.engine_id));

        let deleted = cars(&storage).delete(&ctx, &id).await.unwrap();
        assert_eq!(deleted.id, car.id);

        let err = cars(&storage).get_by_id(&ctx, &id).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { entity: "car", .. }));
        assert!(cars(&storage).delete(&ctx, &id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_with_missing_engine_inserts_nothing() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();

        let err = cars(&storage)
            .create(&ctx, &request("Acme", Uuid::new_v4()))
            .await
            .unwrap_err();

        assert!(err.is_constraint_violation());
        assert_eq!(storage.car_count().await, 0);
        assert!(cars(&storage).get_by_brand(&ctx, "Acme", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let engine = engine(&storage).await;

        let mut bad = request("Acme", engine.engine_id);
        bad.year = "1885".into();
        let err = cars(&storage).create(&ctx, &bad).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidRequest { .. }));

        let mut bad = request("Acme", engine.engine_id);
        bad.price = 0.0;
        assert!(matches!(
            cars(&storage).create(&ctx, &bad).await.unwrap_err(),
            StorageError::InvalidRequest { .. }
        ));
        assert_eq!(storage.car_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_after_delete_is_no_rows_affected() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let engine = engine(&storage).await;
        let car = cars(&storage)
            .create(&ctx, &request("Acme", engine.engine_id))
            .await
            .unwrap();
        let id = car.id.to_string();
        cars(&storage).delete(&ctx, &id).await.unwrap();

        let err = cars(&storage)
            .update(&ctx, &id, &request("Acme", engine.engine_id))
            .await
            .unwrap_err();
        assert!(err.is_no_rows_affected());

        let err = cars(&storage)
            .update(&ctx, "not-a-car", &request("Acme", engine.engine_id))
            .await
            .unwrap_err();
        assert!(err.is_no_rows_affected());
    }

    #[tokio::test]
    async fn test_update_to_missing_engine_leaves_car_unchanged() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let engine = engine(&storage).await;
        let car = cars(&storage)
            .create(&ctx, &request("Acme", engine.engine_id))
            .await
            .unwrap();

        let mut changed = request("Zeta", Uuid::new_v4());
        changed.name = "Renamed".into();
        let err = cars(&storage)
            .update(&ctx, &car.id.to_string(), &changed)
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());

        let fetched = cars(&storage).get_by_id(&ctx, &car.id.to_string()).await.unwrap();
        assert_eq!(fetched, car);
    }

    #[tokio::test]
    async fn test_update_returns_car_with_new_engine() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let first = engine(&storage).await;
        let second = engine(&storage).await;
        let car = cars(&storage)
            .create(&ctx, &request("Acme", first.engine_id))
            .await
            .unwrap();

        let mut changed = request("Acme", second.engine_id);
        changed.price = 30000.0;
        let updated = cars(&storage)
            .update(&ctx, &car.id.to_string(), &changed)
            .await
            .unwrap();

        assert_eq!(updated.id, car.id);
        assert_eq!(updated.created_at, car.created_at);
        assert!(updated.updated_at >= car.updated_at);
        assert_eq!(updated.price, 30000.0);
        assert_eq!(updated.engine, Some(second));
    }

    #[tokio::test]
    async fn test_listing_projections_are_cached_separately() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let engine = engine(&storage).await;
        cars(&storage)
            .create(&ctx, &request("Acme", engine.engine_id))
            .await
            .unwrap();

        let flat = cars(&storage).get_by_brand(&ctx, "Acme", false).await.unwrap();
        assert!(flat[0].engine.is_none());

        let joined = cars(&storage).get_by_brand(&ctx, "Acme", true).await.unwrap();
        assert_eq!(joined[0].engine.as_ref(), Some(&engine));
    }

    #[tokio::test]
    async fn test_cached_listing_hides_direct_changes() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let engine = engine(&storage).await;
        let car = cars(&storage)
            .create(&ctx, &request("Acme", engine.engine_id))
            .await
            .unwrap();
        let cached = cars(&storage).get_by_brand(&ctx, "Acme", true).await.unwrap();

        // Bypasses the store, so nothing is invalidated
        {
            let mut tables = storage.tables.write().await;
            if let Some(record) = tables.cars.get_mut(&car.id) {
                record.car.name = "Changed".into();
            }
        }

        assert_eq!(cars(&storage).get_by_brand(&ctx, "Acme", true).await.unwrap(), cached);
        assert_eq!(
            cars(&storage).get_by_id(&ctx, &car.id.to_string()).await.unwrap().name,
            "Changed"
        );
    }

    #[tokio::test]
    async fn test_disabled_cache_reads_through_every_time() {
        let storage = InMemoryStorage::with_cache(BrandCache::disabled());
        let ctx = RequestContext::background();
        let engine = engine(&storage).await;
        let car = cars(&storage)
            .create(&ctx, &request("Acme", engine.engine_id))
            .await
            .unwrap();
        cars(&storage).get_by_brand(&ctx, "Acme", false).await.unwrap();

        storage.tables.write().await.cars.remove(&car.id);

        assert!(cars(&storage).get_by_brand(&ctx, "Acme", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writes_invalidate_affected_brands() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let engine = engine(&storage).await;

        assert!(cars(&storage).get_by_brand(&ctx, "Acme", true).await.unwrap().is_empty());
        assert!(cars(&storage).get_by_brand(&ctx, "Zeta", false).await.unwrap().is_empty());

        let car = cars(&storage)
            .create(&ctx, &request("Acme", engine.engine_id))
            .await
            .unwrap();
        assert_eq!(cars(&storage).get_by_brand(&ctx, "Acme", true).await.unwrap().len(), 1);

        cars(&storage)
            .update(&ctx, &car.id.to_string(), &request("Zeta", engine.engine_id))
            .await
            .unwrap();
        assert!(cars(&storage).get_by_brand(&ctx, "Acme", true).await.unwrap().is_empty());
        assert_eq!(cars(&storage).get_by_brand(&ctx, "Zeta", false).await.unwrap().len(), 1);

        cars(&storage).delete(&ctx, &car.id.to_string()).await.unwrap();
        assert!(cars(&storage).get_by_brand(&ctx, "Zeta", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_misses_agree_with_tables() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let engine = engine(&storage).await;
        for _ in 0..4 {
            cars(&storage)
                .create(&ctx, &request("Acme", engine.engine_id))
                .await
                .unwrap();
        }
        let expected = storage
            .tables
            .read()
            .await
            .cars_by_brand("Acme", CarProjection::WithEngine);

        let results =
            join_all((0..16).map(|_| cars(&storage).get_by_brand(&ctx, "Acme", true))).await;

        for result in results {
            assert_eq!(result.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_listing_keeps_insertion_order() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let engine = engine(&storage).await;

        let mut ids = Vec::new();
        for _ in 0..5 {
            let car = cars(&storage)
                .create(&ctx, &request("Acme", engine.engine_id))
                .await
                .unwrap();
            ids.push(car.id);
        }

        let listed: Vec<Uuid> = cars(&storage)
            .get_by_brand(&ctx, "Acme", false)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_cancelled_listing_is_not_cached() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        ctx.cancel();

        let err = cars(&storage).get_by_brand(&ctx, "Acme", true).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(
            storage.cache().lookup("Acme", CarProjection::WithEngine).await,
            CacheLookup::Miss
        );
    }
}
