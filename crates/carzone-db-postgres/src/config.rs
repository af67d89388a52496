//! Configuration types for the PostgreSQL storage backend.

use serde::{Deserialize, Serialize};

/// Connection, pool and start-up settings for the car/engine database.
///
/// Every field has a default, so a config section may name only the
/// values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// e.g. `postgres://carzone:secret@db:5432/carzone`
    pub url: String,

    pub pool_size: u32,

    /// Idle connections to keep; a quarter of `pool_size` when unset.
    pub min_connections: Option<u32>,

    /// Upper bound for acquiring a pooled connection.
    pub connect_timeout_ms: u64,

    pub idle_timeout_ms: Option<u64>,

    /// Recycle connections after this long; 30 minutes when unset.
    pub max_lifetime_secs: Option<u64>,

    /// Apply the embedded schema migrations during start-up.
    pub run_migrations: bool,

    /// Connect attempts before start-up gives up.
    pub startup_attempts: u32,

    pub startup_retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/carzone".into(),
            pool_size: 10,
            min_connections: None,
            connect_timeout_ms: 5000,
            idle_timeout_ms: Some(300_000),
            max_lifetime_secs: None,
            run_migrations: true,
            startup_attempts: 5,
            startup_retry_delay_ms: 1000,
        }
    }
}

impl PostgresConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    #[must_use]
    pub fn with_connect_timeout_ms(mut self, timeout: u64) -> Self {
        self.connect_timeout_ms = timeout;
        self
    }

    #[must_use]
    pub fn with_idle_timeout_ms(mut self, timeout: Option<u64>) -> Self {
        self.idle_timeout_ms = timeout;
        self
    }

    #[must_use]
    pub fn with_run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets how often and how far apart start-up retries the connection.
    #[must_use]
    pub fn with_startup_retries(mut self, attempts: u32, delay_ms: u64) -> Self {
        self.startup_attempts = attempts;
        self.startup_retry_delay_ms = delay_ms;
        self
    }
}
