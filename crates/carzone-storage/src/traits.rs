//! Storage traits for the CarZone storage abstraction layer.
//!
//! Identifiers arrive as the strings callers received from earlier responses.
//! A string that is not a valid identifier behaves like an identifier with no
//! row behind it.

use async_trait::async_trait;

use carzone_core::{Car, CarRequest, Engine, EngineRequest, RequestContext};

use crate::error::StorageError;

/// CRUD operations for engines.
///
/// Implementations must be thread-safe (`Send + Sync`). Every mutating
/// operation runs in its own transaction and either applies completely or
/// not at all.
#[async_trait]
pub trait EngineStorage: Send + Sync {
    /// Reads an engine by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no engine has this ID.
    async fn get_by_id(&self, ctx: &RequestContext, id: &str) -> Result<Engine, StorageError>;

    /// Creates an engine under a freshly generated ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRequest` if the request fails validation.
    async fn create(
        &self,
        ctx: &RequestContext,
        request: &EngineRequest,
    ) -> Result<Engine, StorageError>;

    /// Replaces the attributes of an existing engine.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the engine does not exist before the
    /// write, and `StorageError::NoRowsAffected` if it vanished between the
    /// existence check and the update.
    async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: &EngineRequest,
    ) -> Result<Engine, StorageError>;

    /// Deletes an engine and returns the row as it was.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the engine does not exist,
    /// `StorageError::ConstraintViolation` if cars reference it and the store
    /// restricts such deletes, and `StorageError::NoRowsAffected` if the
    /// delete matched nothing.
    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<Engine, StorageError>;
}

/// CRUD operations for cars.
///
/// Every car write drops the cached brand listings it can affect.
#[async_trait]
pub trait CarStorage: Send + Sync {
    /// Reads a car by ID with its engine attached.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no car has this ID.
    async fn get_by_id(&self, ctx: &RequestContext, id: &str) -> Result<Car, StorageError>;

    /// Lists every car of a brand.
    ///
    /// When `include_engine` is set each car carries its engine. Results may
    /// come from the brand cache and can lag behind writes made by other
    /// processes by at most the cache freshness window. Row order is
    /// unspecified.
    async fn get_by_brand(
        &self,
        ctx: &RequestContext,
        brand: &str,
        include_engine: bool,
    ) -> Result<Vec<Car>, StorageError>;

    /// Creates a car referencing an existing engine.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConstraintViolation` if the engine does not
    /// exist; nothing is inserted in that case.
    async fn create(&self, ctx: &RequestContext, request: &CarRequest)
    -> Result<Car, StorageError>;

    /// Replaces a car's attributes and returns it with its engine attached.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NoRowsAffected` if the car does not exist and
    /// `StorageError::ConstraintViolation` if the new engine does not exist.
    async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: &CarRequest,
    ) -> Result<Car, StorageError>;

    /// Deletes a car and returns the row as it was.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the car does not exist and
    /// `StorageError::NoRowsAffected` if the delete matched nothing.
    async fn delete(&self, ctx: &RequestContext, id: &str) -> Result<Car, StorageError>;
}
