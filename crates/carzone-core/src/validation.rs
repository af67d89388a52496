//! Request validation. Stores run these before any statement is issued.
use crate::error::{CoreError, Result};
use crate::model::{CarRequest, EngineRequest};
use crate::time::current_year;

/// Year of the first production automobile.
pub const MIN_CAR_YEAR: i32 = 1886;

impl EngineRequest {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("displacement", self.displacement)?;
        ensure_positive("cylinder_count", self.cylinder_count)?;
        ensure_positive("range", self.range)
    }
}

impl CarRequest {
    pub fn validate(&self) -> Result<()> {
        ensure_present("name", &self.name)?;
        ensure_present("brand", &self.brand)?;
        validate_year(&self.year)?;
        if self.engine_id.is_nil() {
            return Err(CoreError::invalid_request("engine_id is required"));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(CoreError::invalid_request("price must be greater than zero"));
        }
        Ok(())
    }
}

fn ensure_positive(field: &str, value: i64) -> Result<()> {
    if value <= 0 {
        return Err(CoreError::invalid_request(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(())
}

fn ensure_present(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CoreError::invalid_request(format!("{field} is required")));
    }
    Ok(())
}

fn validate_year(year: &str) -> Result<()> {
    if year.trim().is_empty() {
        return Err(CoreError::invalid_request("year is required"));
    }
    let parsed: i32 = year
        .trim()
        .parse()
        .map_err(|_| CoreError::invalid_request("year must be a valid number"))?;
    let max = current_year();
    if !(MIN_CAR_YEAR..=max).contains(&parsed) {
        return Err(CoreError::invalid_request(format!(
            "year must be between {MIN_CAR_YEAR} and {max}"
        )));
    }
    Ok(())
}
