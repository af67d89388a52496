pub mod context;
pub mod error;
pub mod id;
pub mod model;
pub mod time;
mod validation;

pub use context::{ContextError, RequestContext};
pub use error::{CoreError, Result};
pub use id::{generate_id, parse_id};
pub use model::{Car, CarProjection, CarRequest, Engine, EngineRequest};
pub use time::{current_year, now_utc};
pub use validation::MIN_CAR_YEAR;
