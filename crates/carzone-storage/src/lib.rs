//! # carzone-storage
//!
//! Storage abstraction layer for CarZone.
//!
//! This crate defines the contract every persistence backend implements. It
//! contains no backend itself; see `carzone-db-postgres` and
//! `carzone-db-memory`.
//!
//! ## Overview
//!
//! - [`EngineStorage`]: CRUD for engines
//! - [`CarStorage`]: CRUD for cars plus the cached brand listing
//! - [`StorageError`]: the typed error every operation returns
//!
//! ## Example
//!
//! ```ignore
//! use carzone_core::RequestContext;
//! use carzone_storage::{CarStorage, StorageError};
//!
//! async fn car_name(cars: &dyn CarStorage, id: &str) -> Result<String, StorageError> {
//!     let ctx = RequestContext::background();
//!     Ok(cars.get_by_id(&ctx, id).await?.name)
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{CarStorage, EngineStorage};
pub use types::{CAR_ENTITY, ENGINE_ENTITY, EngineDeletePolicy};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared engine store.
pub type DynEngineStorage = std::sync::Arc<dyn EngineStorage>;

/// Type alias for a shared car store.
pub type DynCarStorage = std::sync::Arc<dyn CarStorage>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use carzone_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::{CarStorage, EngineStorage};
    pub use crate::types::EngineDeletePolicy;
    pub use crate::{DynCarStorage, DynEngineStorage, StorageResult};
}
