//! Row tuples returned by the store queries and their mapping to domain types.
//!
//! Column order in every `SELECT` list must match the tuple layouts here.

use time::OffsetDateTime;
use uuid::Uuid;

use carzone_core::{Car, Engine};

/// `id, displacement, no_of_cylinders, car_range`
pub(crate) type EngineRow = (Uuid, i64, i64, i64);

/// `id, name, year, brand, fuel_type, engine_id, price, created_at, updated_at`
pub(crate) type CarRow = (
    Uuid,
    String,
    String,
    String,
    String,
    Option<Uuid>,
    f64,
    OffsetDateTime,
    OffsetDateTime,
);

/// A car row followed by the columns of its LEFT JOINed engine.
pub(crate) type CarEngineRow = (
    Uuid,
    String,
    String,
    String,
    String,
    Option<Uuid>,
    f64,
    OffsetDateTime,
    OffsetDateTime,
    Option<Uuid>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
);

/// A joined car row followed by the brand the car had before the update.
pub(crate) type UpdatedCarRow = (
    Uuid,
    String,
    String,
    String,
    String,
    Option<Uuid>,
    f64,
    OffsetDateTime,
    OffsetDateTime,
    Option<Uuid>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    String,
);

pub(crate) fn engine_from_tuple(row: EngineRow) -> Engine {
    Engine {
        engine_id: row.0,
        displacement: row.1,
        cylinder_count: row.2,
        range: row.3,
    }
}

pub(crate) fn car_from_tuple(row: CarRow) -> Car {
    Car {
        id: row.0,
        name: row.1,
        year: row.2,
        brand: row.3,
        fuel_type: row.4,
        engine_id: row.5,
        engine: None,
        price: row.6,
        created_at: row.7,
        updated_at: row.8,
    }
}

pub(crate) fn car_engine_from_tuple(row: CarEngineRow) -> Car {
    let engine = match (row.9, row.10, row.11, row.12) {
        (Some(engine_id), Some(displacement), Some(cylinder_count), Some(range)) => Some(Engine {
            engine_id,
            displacement,
            cylinder_count,
            range,
        }),
        _ => None,
    };

    let mut car = car_from_tuple((
        row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8,
    ));
    car.engine = engine;
    car
}

/// Splits an updated row into the car and its previous brand.
pub(crate) fn updated_car_from_tuple(row: UpdatedCarRow) -> (Car, String) {
    let car = car_engine_from_tuple((
        row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8, row.9, row.10, row.11,
        row.12,
    ));
    (car, row.13)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car_tuple(engine_id: Option<Uuid>) -> CarRow {
        let now = OffsetDateTime::now_utc();
        (
            Uuid::new_v4(),
            "Roadster".into(),
            "2019".into(),
            "Acme".into(),
            "Electric".into(),
            engine_id,
            50_000.0,
            now,
            now,
        )
    }

    #[test]
    fn test_joined_row_with_engine() {
        let engine_id = Uuid::new_v4();
        let c = car_tuple(Some(engine_id));
        let car = car_engine_from_tuple((
            c.0,
            c.1,
            c.2,
            c.3,
            c.4,
            c.5,
            c.6,
            c.7,
            c.8,
            Some(engine_id),
            Some(2000),
            Some(4),
            Some(600),
        ));

        assert_eq!(car.engine_id, Some(engine_id));
        assert_eq!(
            car.engine,
            Some(Engine {
                engine_id,
                displacement: 2000,
                cylinder_count: 4,
                range: 600,
            })
        );
    }

    #[test]
    fn test_joined_row_without_engine() {
        let c = car_tuple(None);
        let car = car_engine_from_tuple((
            c.0, c.1, c.2, c.3, c.4, c.5, c.6, c.7, c.8, None, None, None, None,
        ));
        assert_eq!(car.engine_id, None);
        assert!(car.engine.is_none());
    }

    #[test]
    fn test_flat_row_has_no_engine() {
        let car = car_from_tuple(car_tuple(Some(Uuid::new_v4())));
        assert!(car.engine.is_none());
        assert_eq!(car.brand, "Acme");
    }

    #[test]
    fn test_updated_row_carries_previous_brand() {
        let c = car_tuple(None);
        let (car, previous) = updated_car_from_tuple((
            c.0,
            c.1,
            c.2,
            c.3,
            c.4,
            c.5,
            c.6,
            c.7,
            c.8,
            None,
            None,
            None,
            None,
            "Zeta".into(),
        ));
        assert_eq!(car.brand, "Acme");
        assert_eq!(previous, "Zeta");
    }
}
