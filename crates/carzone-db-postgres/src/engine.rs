//! PostgreSQL engine store.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::debug;
use uuid::Uuid;

use carzone_cache::BrandCache;
use carzone_core::{Engine, EngineRequest, RequestContext, generate_id, now_utc};
use carzone_storage::{ENGINE_ENTITY, EngineDeletePolicy, EngineStorage, StorageError};

use crate::error::{classify, id_or_not_found};
use crate::rows::{EngineRow, engine_from_tuple};
use crate::transaction;

const SELECT_ENGINE: &str = r#"
    SELECT id, displacement, no_of_cylinders, car_range
    FROM engine
    WHERE id = $1
"#;

const SELECT_ENGINE_FOR_UPDATE: &str = r#"
    SELECT id, displacement, no_of_cylinders, car_range
    FROM engine
    WHERE id = $1
    FOR UPDATE
"#;

const INSERT_ENGINE: &str = r#"
    INSERT INTO engine (id, displacement, no_of_cylinders, car_range, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $5)
    RETURNING id, displacement, no_of_cylinders, car_range
"#;

const UPDATE_ENGINE: &str = r#"
    UPDATE engine
    SET displacement = $2, no_of_cylinders = $3, car_range = $4, updated_at = $5
    WHERE id = $1
"#;

const REFERENCING_BRANDS: &str = r#"
    SELECT DISTINCT brand FROM car WHERE engine_id = $1
"#;

const COUNT_REFERENCING_CARS: &str = r#"
    SELECT COUNT(*) FROM car WHERE engine_id = $1
"#;

const DETACH_CARS: &str = r#"
    UPDATE car
    SET engine_id = NULL, updated_at = $2
    WHERE engine_id = $1
    RETURNING brand
"#;

const DELETE_ENGINE: &str = "DELETE FROM engine WHERE id = $1";

/// Engine CRUD over a shared pool.
///
/// Engines are not cached themselves, but joined brand listings embed them,
/// so writes that change what those listings show drop the affected brands.
#[derive(Debug, Clone)]
pub struct PostgresEngineStore {
    pool: PgPool,
    cache: BrandCache,
    delete_policy: EngineDeletePolicy,
}

impl PostgresEngineStore {
    #[must_use]
    pub fn new(pool: PgPool, cache: BrandCache) -> Self {
        Self {
            pool,
            cache,
            delete_policy: EngineDeletePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_delete_policy(mut self, policy: EngineDeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn delete_policy(&self) -> EngineDeletePolicy {
        self.delete_policy
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Engine>, StorageError> {
        let row: Option<EngineRow> = query_as(SELECT_ENGINE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("Failed to read engine", e))?;
        Ok(row.map(engine_from_tuple))
    }

    async fn update_in_tx(
        &self,
        id: Uuid,
        request: &EngineRequest,
    ) -> Result<Vec<String>, StorageError> {
        let mut tx = transaction::begin(&self.pool).await?;

        let result = query(UPDATE_ENGINE)
            .bind(id)
            .bind(request.displacement)
            .bind(request.cylinder_count)
            .bind(request.range)
            .bind(now_utc())
            .execute(&mut *tx)
            .await
            .map_err(|e| classify("Failed to update engine", e))?;

        if result.rows_affected() != 1 {
            return Err(StorageError::no_rows_affected(ENGINE_ENTITY, id.to_string()));
        }

        let brands: Vec<(String,)> = query_as(REFERENCING_BRANDS)
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| classify("Failed to read cars of engine", e))?;

        transaction::commit(tx).await?;
        Ok(brands.into_iter().map(|(brand,)| brand).collect())
    }

    async fn delete_in_tx(&self, id: Uuid) -> Result<(Engine, Vec<String>), StorageError> {
        let mut tx = transaction::begin(&self.pool).await?;

        let row: Option<EngineRow> = query_as(SELECT_ENGINE_FOR_UPDATE)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| classify("Failed to read engine", e))?;
        let engine = row
            .map(engine_from_tuple)
            .ok_or_else(|| StorageError::not_found(ENGINE_ENTITY, id.to_string()))?;

        let detached_brands = match self.delete_policy {
            EngineDeletePolicy::Restrict => {
                let (count,): (i64,) = query_as(COUNT_REFERENCING_CARS)
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| classify("Failed to count cars of engine", e))?;
                if count > 0 {
                    return Err(StorageError::constraint_violation(format!(
                        "engine {id} is still referenced by {count} car(s)"
                    )));
                }
                Vec::new()
            }
            EngineDeletePolicy::Detach => {
                let brands: Vec<(String,)> = query_as(DETACH_CARS)
                    .bind(id)
                    .bind(now_utc())
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(|e| classify("Failed to detach cars from engine", e))?;
                brands.into_iter().map(|(brand,)| brand).collect()
            }
        };

        let result = query(DELETE_ENGINE)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify("Failed to delete engine", e))?;

        if result.rows_affected() != 1 {
            return Err(StorageError::no_rows_affected(ENGINE_ENTITY, id.to_string()));
        }

        transaction::commit(tx).await?;
        Ok((engine, detached_brands))
    }
}

#[async_trait]
impl EngineStorage for PostgresEngineStore {
    async fn get_by_id(&self, ctx: &RequestContext, id: &str) -> Result<Engine, StorageError> {
        let engine_id = id_or_not_found(ENGINE_ENTITY, id)?;
        ctx.run(self.fetch(engine_id))
            .await?
            .ok_or_else(|| StorageError::not_found(ENGINE_ENTITY, id))
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        request: &EngineRequest,
    ) -> Result<Engine, StorageError> {
        request.validate()?;
        let engine_id = generate_id();
        let now = now_utc();

        let engine = ctx
            .run(async {
                let mut tx = transaction::begin(&self.pool).await?;
                let row: EngineRow = query_as(INSERT_ENGINE)
                    .bind(engine_id)
                    .bind(request.displacement)
                    .bind(request.cylinder_count)
                    .bind(request.range)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| classify("Failed to insert engine", e))?;
                transaction::commit(tx).await?;
                Ok::<_, StorageError>(engine_from_tuple(row))
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
        let engine_id = id_or_not_found(ENGINE_ENTITY, id)?;

        let brands = ctx
            .run(async {
                // Advisory; the row count of the update is what decides.
                if self.fetch(engine_id).await?.is_none() {
                    return Err(StorageError::not_found(ENGINE_ENTITY, id));
                }
                self.update_in_tx(engine_id, request).await
            })
            .await?;

        self.cache
            .invalidate_brands(brands.iter().map(String::as_str))
            .await;

        debug!(engine_id = %engine_id, "Engine updated");
        Ok(request.clone().into_engine(engine_id))
    }

    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<Engine, StorageError> {
        let engine_id = id_or_not_found(ENGINE_ENTITY, id)?;

        let (engine, detached_brands) = ctx.run(self.delete_in_tx(engine_id)).await?;

        self.cache
            .invalidate_brands(detached_brands.iter().map(String::as_str))
            .await;

        debug!(
            engine_id = %engine_id,
            brands = detached_brands.len(),
            "Engine deleted"
        );
        Ok(engine)
    }
}
