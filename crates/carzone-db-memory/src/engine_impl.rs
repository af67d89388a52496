//! `EngineStorage` implementation for `InMemoryStorage`.

use async_trait::async_trait;
use tracing::debug;

use carzone_core::{Engine, EngineRequest, RequestContext, generate_id, now_utc, parse_id};
use carzone_storage::{ENGINE_ENTITY, EngineDeletePolicy, EngineStorage, StorageError};

use crate::storage::InMemoryStorage;

fn distinct(mut brands: Vec<String>) -> Vec<String> {
    brands.sort();
    brands.dedup();
    brands
}

#[async_trait]
impl EngineStorage for InMemoryStorage {
    async fn get_by_id(&self, ctx: &RequestContext, id: &str) -> Result<Engine, StorageError> {
        let engine_id = parse_id(id).map_err(|_| StorageError::not_found(ENGINE_ENTITY, id))?;
        ctx.run(async {
            let tables = self.tables.read().await;
            tables
                .engines
                .get(&engine_id)
                .cloned()
                .ok_or_else(|| StorageError::not_found(ENGINE_ENTITY, id))
        })
        .await
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        request: &EngineRequest,
    ) -> Result<Engine, StorageError> {
        request.validate()?;
        let engine = request.clone().into_engine(generate_id());

        ctx.run(async {
            let mut tables = self.tables.write().await;
            tables.engines.insert(engine.engine_id, engine.clone());
            Ok::<_, StorageError>(())
        })
        .await?;

        debug!(engine_id = %engine.engine_id, "Engine created");
        Ok(engine)
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: &EngineRequest,
    ) -> Result<Engine, StorageError> {
        request.validate()?;
        let engine_id = parse_id(id).map_err(|_| StorageError::not_found(ENGINE_ENTITY, id))?;
        let engine = request.clone().into_engine(engine_id);

        let brands = ctx
            .run(async {
                let mut tables = self.tables.write().await;
                let Some(slot) = tables.engines.get_mut(&engine_id) else {
                    return Err(StorageError::not_found(ENGINE_ENTITY, id));
                };
                *slot = engine.clone();

                let brands = tables
                    .cars_of_engine(engine_id)
                    .map(|car| car.brand.clone())
                    .collect();
                Ok(distinct(brands))
            })
            .await?;

        self.cache
            .invalidate_brands(brands.iter().map(String::as_str))
            .await;

        debug!(engine_id = %engine_id, "Engine updated");
        Ok(engine)
    }

    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<Engine, StorageError> {
        let engine_id = parse_id(id).map_err(|_| StorageError::not_found(ENGINE_ENTITY, id))?;
        let policy = self.delete_policy;

        let (engine, detached_brands) = ctx
            .run(async {
                let mut tables = self.tables.write().await;
                if !tables.engines.contains_key(&engine_id) {
                    return Err(StorageError::not_found(ENGINE_ENTITY, id));
                }

                let brands = match policy {
                    EngineDeletePolicy::Restrict => {
                        let count = tables.cars_of_engine(engine_id).count();
                        if count > 0 {
                            return Err(StorageError::constraint_violation(format!(
                                "engine {engine_id} is still referenced by {count} car(s)"
                            )));
                        }
                        Vec::new()
                    }
                    EngineDeletePolicy::Detach => {
                        let now = now_utc();
                        let brands = tables
                            .cars_of_engine_mut(engine_id)
                            .map(|car| {
                                car.engine_id = None;
                                car.updated_at = now;
                                car.brand.clone()
                            })
                            .collect();
                        distinct(brands)
                    }
                };

                let engine = tables
                    .engines
                    .remove(&engine_id)
                    .ok_or_else(|| StorageError::no_rows_affected(ENGINE_ENTITY, id))?;
                Ok((engine, brands))
            })
            .await?;

        self.cache
            .invalidate_brands(detached_brands.iter().map(String::as_str))
            .await;

        debug!(engine_id = %engine_id, brands = detached_brands.len(), "Engine deleted");
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carzone_core::{CarProjection, CarRequest};
    use carzone_storage::CarStorage;
    use std::time::Duration;

    fn engines(storage: &InMemoryStorage) -> &dyn EngineStorage {
        storage
    }

    fn cars(storage: &InMemoryStorage) -> &dyn CarStorage {
        storage
    }

    fn car_request(brand: &str, engine_id: uuid::Uuid) -> CarRequest {
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
    async fn test_create_then_get_returns_request_fields() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let request = EngineRequest::new(2000, 4, 500);

        let created = engines(&storage).create(&ctx, &request).await.unwrap();
        let fetched = engines(&storage)
            .get_by_id(&ctx, &created.engine_id.to_string())
            .await
            .unwrap();

        assert_eq!(fetched, request.into_engine(created.engine_id));
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_storing() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();

        let err = engines(&storage)
            .create(&ctx, &EngineRequest::new(0, 4, 500))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidRequest { .. }));
        assert_eq!(storage.engine_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let created = engines(&storage)
            .create(&ctx, &EngineRequest::new(2000, 4, 500))
            .await
            .unwrap();
        let id = created.engine_id.to_string();

        let deleted = engines(&storage).delete(&ctx, &id).await.unwrap();
        assert_eq!(deleted, created);

        assert!(engines(&storage).get_by_id(&ctx, &id).await.unwrap_err().is_not_found());
        assert!(engines(&storage).delete(&ctx, &id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_missing_engine_writes_nothing() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();

        let err = engines(&storage)
            .update(
                &ctx,
                &uuid::Uuid::new_v4().to_string(),
                &EngineRequest::new(2000, 4, 500),
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(storage.engine_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_attributes() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let created = engines(&storage)
            .create(&ctx, &EngineRequest::new(2000, 4, 500))
            .await
            .unwrap();
        let id = created.engine_id.to_string();

        let updated = engines(&storage)
            .update(&ctx, &id, &EngineRequest::new(3000, 6, 650))
            .await
            .unwrap();

        assert_eq!(updated.engine_id, created.engine_id);
        assert_eq!(engines(&storage).get_by_id(&ctx, &id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_malformed_id_is_not_found() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();

        let err = engines(&storage).get_by_id(&ctx, "engine-1").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::NotFound { entity: "engine", ref id } if id == "engine-1"
        ));
        assert!(engines(&storage).delete(&ctx, "").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_restrict_policy_keeps_referenced_engine() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let engine = engines(&storage)
            .create(&ctx, &EngineRequest::new(2000, 4, 500))
            .await
            .unwrap();
        cars(&storage)
            .create(&ctx, &car_request("Acme", engine.engine_id))
            .await
            .unwrap();

        let err = engines(&storage)
            .delete(&ctx, &engine.engine_id.to_string())
            .await
            .unwrap_err();

        assert!(err.is_constraint_violation());
        assert_eq!(storage.engine_count().await, 1);
    }

    #[tokio::test]
    async fn test_detach_policy_clears_references_and_listings() {
        let storage = InMemoryStorage::new().with_delete_policy(EngineDeletePolicy::Detach);
        let ctx = RequestContext::background();
        let engine = engines(&storage)
            .create(&ctx, &EngineRequest::new(2000, 4, 500))
            .await
            .unwrap();
        let car = cars(&storage)
            .create(&ctx, &car_request("Acme", engine.engine_id))
            .await
            .unwrap();
        let listing = cars(&storage).get_by_brand(&ctx, "Acme", true).await.unwrap();
        assert_eq!(listing[0].engine.as_ref(), Some(&engine));

        engines(&storage)
            .delete(&ctx, &engine.engine_id.to_string())
            .await
            .unwrap();

        let detached = cars(&storage).get_by_id(&ctx, &car.id.to_string()).await.unwrap();
        assert_eq!(detached.engine_id, None);
        assert!(detached.engine.is_none());
        assert!(detached.updated_at >= car.updated_at);

        let listing = cars(&storage).get_by_brand(&ctx, "Acme", true).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert!(listing[0].engine.is_none());
    }

    #[tokio::test]
    async fn test_engine_update_drops_joined_listings() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        let engine = engines(&storage)
            .create(&ctx, &EngineRequest::new(2000, 4, 500))
            .await
            .unwrap();
        cars(&storage)
            .create(&ctx, &car_request("Acme", engine.engine_id))
            .await
            .unwrap();
        cars(&storage).get_by_brand(&ctx, "Acme", true).await.unwrap();

        engines(&storage)
            .update(
                &ctx,
                &engine.engine_id.to_string(),
                &EngineRequest::new(1600, 3, 400),
            )
            .await
            .unwrap();

        let listing = cars(&storage).get_by_brand(&ctx, "Acme", true).await.unwrap();
        assert_eq!(listing[0].engine.as_ref().map(|e| e.displacement), Some(1600));
        assert_eq!(
            storage.cache().lookup("Acme", CarProjection::WithEngine).await,
            carzone_cache::CacheLookup::Hit(listing)
        );
    }

    #[tokio::test]
    async fn test_cancelled_context_fails_fast() {
        let storage = InMemoryStorage::new();
        let ctx = RequestContext::background();
        ctx.cancel();

        let err = engines(&storage)
            .create(&ctx, &EngineRequest::new(2000, 4, 500))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(storage.engine_count().await, 0);
    }

    #[tokio::test]
    async fn test_deadline_while_waiting_leaves_no_write() {
        let storage = InMemoryStorage::new();
        let guard = storage.tables.write().await;

        let ctx = RequestContext::with_timeout(Duration::from_millis(20));
        let err = engines(&storage)
            .create(&ctx, &EngineRequest::new(2000, 4, 500))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Cancelled {
                reason: carzone_core::ContextError::DeadlineExceeded
            }
        ));

        drop(guard);
        assert_eq!(storage.engine_count().await, 0);
    }
}
