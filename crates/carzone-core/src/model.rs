//! Domain entities persisted by the stores.
//!
//! The serde representation of [`Car`] is also the payload format of the
//! brand listing cache, so renaming a field here invalidates every cached
//! entry (they simply decode as misses until they expire).

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// An engine row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engine {
    pub engine_id: Uuid,
    pub displacement: i64,
    pub cylinder_count: i64,
    pub range: i64,
}

/// Payload for creating or replacing an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineRequest {
    pub displacement: i64,
    pub cylinder_count: i64,
    pub range: i64,
}

impl EngineRequest {
    pub fn new(displacement: i64, cylinder_count: i64, range: i64) -> Self {
        Self {
            displacement,
            cylinder_count,
            range,
        }
    }

    /// Builds the engine this request describes under the given identity.
    pub fn into_engine(self, engine_id: Uuid) -> Engine {
        Engine {
            engine_id,
            displacement: self.displacement,
            cylinder_count: self.cylinder_count,
            range: self.range,
        }
    }
}

/// A car row, optionally carrying the engine it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: Uuid,
    pub name: String,
    pub year: String,
    pub brand: String,
    pub fuel_type: String,
    /// `None` once the referenced engine was deleted under the detach policy.
    pub engine_id: Option<Uuid>,
    /// Populated only by queries that join the engine table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<Engine>,
    pub price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Payload for creating or replacing a car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarRequest {
    pub name: String,
    /// Model year as sent by clients, e.g. `"2020"`.
    pub year: String,
    pub brand: String,
    pub fuel_type: String,
    pub engine_id: Uuid,
    pub price: f64,
}

/// Shape of the rows returned by a brand listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarProjection {
    /// Car columns joined with the referenced engine.
    WithEngine,
    /// Car columns only.
    Flat,
}

impl CarProjection {
    pub fn from_include_engine(include_engine: bool) -> Self {
        if include_engine {
            Self::WithEngine
        } else {
            Self::Flat
        }
    }

    pub fn includes_engine(self) -> bool {
        matches!(self, Self::WithEngine)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WithEngine => "engine",
            Self::Flat => "flat",
        }
    }

    /// Every projection, used when dropping all cached shapes of a brand.
    pub fn all() -> [CarProjection; 2] {
        [Self::WithEngine, Self::Flat]
    }
}

impl fmt::Display for CarProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
