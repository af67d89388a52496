//! Process bootstrap for CarZone.
//!
//! Loads [`config::AppConfig`], installs tracing and builds the engine and
//! car stores for the configured backend. Request handling lives with the
//! callers of the stores.

pub mod bootstrap;
pub mod config;
pub mod observability;

pub use bootstrap::Stores;
pub use config::AppConfig;
pub use config::loader::load_config;
