//! PostgreSQL car store with the read-through brand listing cache.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::debug;
use uuid::Uuid;

use carzone_cache::{BrandCache, CacheLookup};
use carzone_core::{Car, CarProjection, CarRequest, RequestContext, generate_id, now_utc};
use carzone_storage::{CAR_ENTITY, CarStorage, StorageError};

use crate::error::{classify, id_or_no_rows, id_or_not_found};
use crate::rows::{
    CarEngineRow, CarRow, EngineRow, UpdatedCarRow, car_engine_from_tuple, car_from_tuple,
    engine_from_tuple, updated_car_from_tuple,
};
use crate::transaction;

const SELECT_CAR_WITH_ENGINE: &str = r#"
    SELECT c.id, c.name, c.year, c.brand, c.fuel_type, c.engine_id, c.price,
           c.created_at, c.updated_at,
           e.id, e.displacement, e.no_of_cylinders, e.car_range
    FROM car c
    LEFT JOIN engine e ON e.id = c.engine_id
    WHERE c.id = $1
"#;

const SELECT_CAR_FOR_DELETE: &str = r#"
    SELECT c.id, c.name, c.year, c.brand, c.fuel_type, c.engine_id, c.price,
           c.created_at, c.updated_at,
           e.id, e.displacement, e.no_of_cylinders, e.car_range
    FROM car c
    LEFT JOIN engine e ON e.id = c.engine_id
    WHERE c.id = $1
    FOR UPDATE OF c
"#;

// Neither listing has an ORDER BY; callers must not rely on row order.
const SELECT_BRAND_WITH_ENGINE: &str = r#"
    SELECT c.id, c.name, c.year, c.brand, c.fuel_type, c.engine_id, c.price,
           c.created_at, c.updated_at,
           e.id, e.displacement, e.no_of_cylinders, e.car_range
    FROM car c
    LEFT JOIN engine e ON e.id = c.engine_id
    WHERE c.brand = $1
"#;

const SELECT_BRAND_FLAT: &str = r#"
    SELECT id, name, year, brand, fuel_type, engine_id, price, created_at, updated_at
    FROM car
    WHERE brand = $1
"#;

const SHARE_ENGINE: &str = r#"
    SELECT id, displacement, no_of_cylinders, car_range
    FROM engine
    WHERE id = $1
    FOR SHARE
"#;

const INSERT_CAR: &str = r#"
    INSERT INTO car (id, name, year, brand, fuel_type, engine_id, price, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
    RETURNING id, name, year, brand, fuel_type, engine_id, price, created_at, updated_at
"#;

// Locks the current row, rewrites it and joins the new engine in one
// statement. The previous brand is returned so both listings can be dropped.
const UPDATE_CAR: &str = r#"
    WITH previous AS (
        SELECT id, brand FROM car WHERE id = $1 FOR UPDATE
    ),
    updated AS (
        UPDATE car c
        SET name = $2, year = $3, brand = $4, fuel_type = $5,
            engine_id = $6, price = $7, updated_at = $8
        FROM previous
        WHERE c.id = previous.id
        RETURNING c.id, c.name, c.year, c.brand, c.fuel_type, c.engine_id, c.price,
                  c.created_at, c.updated_at, previous.brand AS previous_brand
    )
    SELECT u.id, u.name, u.year, u.brand, u.fuel_type, u.engine_id, u.price,
           u.created_at, u.updated_at,
           e.id, e.displacement, e.no_of_cylinders, e.car_range,
           u.previous_brand
    FROM updated u
    LEFT JOIN engine e ON e.id = u.engine_id
"#;

const DELETE_CAR: &str = "DELETE FROM car WHERE id = $1";

/// Car CRUD over a shared pool.
///
/// `get_by_brand` reads through the [`BrandCache`]; every write drops the
/// cached listings of the brands it touched once its transaction commits.
#[derive(Debug, Clone)]
pub struct PostgresCarStore {
    pool: PgPool,
    cache: BrandCache,
}

impl PostgresCarStore {
    #[must_use]
    pub fn new(pool: PgPool, cache: BrandCache) -> Self {
        Self { pool, cache }
    }

    pub fn cache(&self) -> &BrandCache {
        &self.cache
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Car>, StorageError> {
        let row: Option<CarEngineRow> = query_as(SELECT_CAR_WITH_ENGINE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("Failed to read car", e))?;
        Ok(row.map(car_engine_from_tuple))
    }

    async fn query_brand(
        &self,
        brand: &str,
        projection: CarProjection,
    ) -> Result<Vec<Car>, StorageError> {
        let cars = match projection {
            CarProjection::WithEngine => {
                let rows: Vec<CarEngineRow> = query_as(SELECT_BRAND_WITH_ENGINE)
                    .bind(brand)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| classify("Failed to list cars by brand", e))?;
                rows.into_iter().map(car_engine_from_tuple).collect()
            }
            CarProjection::Flat => {
                let rows: Vec<CarRow> = query_as(SELECT_BRAND_FLAT)
                    .bind(brand)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| classify("Failed to list cars by brand", e))?;
                rows.into_iter().map(car_from_tuple).collect()
            }
        };
        Ok(cars)
    }

    async fn insert(&self, id: Uuid, request: &CarRequest) -> Result<Car, StorageError> {
        let mut tx = transaction::begin(&self.pool).await?;

        let engine: Option<EngineRow> = query_as(SHARE_ENGINE)
            .bind(request.engine_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| classify("Failed to check engine", e))?;
        let Some(engine) = engine.map(engine_from_tuple) else {
            return Err(StorageError::constraint_violation(format!(
                "engine {} does not exist",
                request.engine_id
            )));
        };

        let row: CarRow = query_as(INSERT_CAR)
            .bind(id)
            .bind(&request.name)
            .bind(&request.year)
            .bind(&request.brand)
            .bind(&request.fuel_type)
            .bind(request.engine_id)
            .bind(request.price)
            .bind(now_utc())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| classify("Failed to insert car", e))?;

        transaction::commit(tx).await?;

        let mut car = car_from_tuple(row);
        car.engine = Some(engine);
        Ok(car)
    }

    async fn update_in_tx(
        &self,
        id: Uuid,
        request: &CarRequest,
    ) -> Result<(Car, String), StorageError> {
        let mut tx = transaction::begin(&self.pool).await?;

        let row: Option<UpdatedCarRow> = query_as(UPDATE_CAR)
            .bind(id)
            .bind(&request.name)
            .bind(&request.year)
            .bind(&request.brand)
            .bind(&request.fuel_type)
            .bind(request.engine_id)
            .bind(request.price)
            .bind(now_utc())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| classify("Failed to update car", e))?;

        let Some(row) = row else {
            return Err(StorageError::no_rows_affected(CAR_ENTITY, id.to_string()));
        };

        transaction::commit(tx).await?;
        Ok(updated_car_from_tuple(row))
    }

    async fn delete_in_tx(&self, id: Uuid) -> Result<Car, StorageError> {
        let mut tx = transaction::begin(&self.pool).await?;

        let row: Option<CarEngineRow> = query_as(SELECT_CAR_FOR_DELETE)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| classify("Failed to read car", e))?;
        let car = row
            .map(car_engine_from_tuple)
            .ok_or_else(|| StorageError::not_found(CAR_ENTITY, id.to_string()))?;

        let result = query(DELETE_CAR)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify("Failed to delete car", e))?;

        if result.rows_affected() != 1 {
            return Err(StorageError::no_rows_affected(CAR_ENTITY, id.to_string()));
        }

        transaction::commit(tx).await?;
        Ok(car)
    }
}

#[async_trait]
impl CarStorage for PostgresCarStore {
    async fn get_by_id(&self, ctx: &RequestContext, id: &str) -> Result<Car, StorageError> {
        let car_id = id_or_not_found(CAR_ENTITY, id)?;
        ctx.run(self.fetch(car_id))
            .await?
            .ok_or_else(|| StorageError::not_found(CAR_ENTITY, id))
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

        let cars = ctx.run(self.query_brand(brand, projection)).await?;
        self.cache.store(brand, projection, &cars).await;
        Ok(cars)
    }

    async fn create(&self, ctx: &RequestContext, request: &CarRequest) -> Result<Car, StorageError> {
        request.validate()?;
        let car_id = generate_id();

        let car = ctx.run(self.insert(car_id, request)).await?;
        self.cache.invalidate_brand(&car.brand).await;

        debug!(car_id = %car.id, brand = %car.brand, "Car created");
        Ok(car)
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: &CarRequest,
    ) -> Result<Car, StorageError> {
        request.validate()?;
        let car_id = id_or_no_rows(CAR_ENTITY, id)?;

        let (car, previous_brand) = ctx.run(self.update_in_tx(car_id, request)).await?;
        self.cache
            .invalidate_brands([previous_brand.as_str(), car.brand.as_str()])
            .await;

        debug!(car_id = %car.id, brand = %car.brand, "Car updated");
        Ok(car)
    }

    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<Car, StorageError> {
        let car_id = id_or_not_found(CAR_ENTITY, id)?;

        let car = ctx.run(self.delete_in_tx(car_id)).await?;
        self.cache.invalidate_brand(&car.brand).await;

        debug!(car_id = %car.id, brand = %car.brand, "Car deleted");
        Ok(car)
    }
}
