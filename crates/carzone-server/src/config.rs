use serde::{Deserialize, Serialize};

use carzone_cache::{BrandCacheConfig, RedisConfig};
use carzone_db_postgres::PostgresConfig;
use carzone_storage::EngineDeletePolicy;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub postgres: PostgresConfig,
    /// Shared cache backend; the local map is used while disabled
    #[serde(default)]
    pub redis: RedisConfig,
    /// Brand listing cache
    #[serde(default)]
    pub cache: BrandCacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.storage.backend == StorageBackend::Postgres {
            if self.postgres.url.trim().is_empty() {
                return Err("postgres.url must not be empty".into());
            }
            if self.postgres.pool_size == 0 {
                return Err("postgres.pool_size must be > 0".into());
            }
            if self.postgres.startup_attempts == 0 {
                return Err("postgres.startup_attempts must be > 0".into());
            }
        }
        if self.redis.enabled {
            if self.redis.url.trim().is_empty() {
                return Err("redis.enabled=true requires redis.url".into());
            }
            if self.redis.pool_size == 0 {
                return Err("redis.pool_size must be > 0".into());
            }
        }
        if self.cache.enabled && self.cache.brand_ttl_secs == 0 {
            return Err("cache.brand_ttl_secs must be > 0 while the cache is enabled".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local tables, lost on exit
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Postgres => write!(f, "postgres"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    /// What deleting a referenced engine does
    #[serde(default)]
    pub engine_delete_policy: EngineDeletePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    /// Default configuration file, resolved against the working directory.
    pub const DEFAULT_CONFIG_PATH: &str = "carzone.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        // A missing file means defaults plus environment
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., CARZONE__POSTGRES__POOL_SIZE=20
        builder = builder.add_source(
            Environment::with_prefix("CARZONE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<AppConfig, String> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.storage.backend, StorageBackend::Postgres);
        assert_eq!(cfg.storage.engine_delete_policy, EngineDeletePolicy::Restrict);
        assert_eq!(cfg.cache.brand_ttl_secs, 60);
        assert!(!cfg.redis.enabled);
    }

    #[test]
    fn test_validation_errors() {
        let mut cfg = AppConfig::default();
        cfg.postgres.pool_size = 0;
        assert!(cfg.validate().unwrap_err().contains("postgres.pool_size"));

        // Postgres settings are irrelevant for the memory backend
        cfg.storage.backend = StorageBackend::Memory;
        assert!(cfg.validate().is_ok());

        let mut cfg = AppConfig::default();
        cfg.redis.enabled = true;
        cfg.redis.url = String::new();
        assert!(cfg.validate().unwrap_err().contains("redis.url"));

        let mut cfg = AppConfig::default();
        cfg.cache.brand_ttl_secs = 0;
        assert!(cfg.validate().unwrap_err().contains("brand_ttl_secs"));
        cfg.cache.enabled = false;
        assert!(cfg.validate().is_ok());

        let mut cfg = AppConfig::default();
        cfg.logging.level = "verbose".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));
    }

    #[test]
    fn test_storage_settings_deserialize() {
        let settings: StorageSettings =
            serde_json::from_str(r#"{"backend": "memory", "engine_delete_policy": "detach"}"#)
                .unwrap();
        assert_eq!(settings.backend, StorageBackend::Memory);
        assert_eq!(settings.engine_delete_policy, EngineDeletePolicy::Detach);
        assert_eq!(StorageBackend::Memory.to_string(), "memory");
    }
}
