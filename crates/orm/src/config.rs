//! Database connection settings

use inkpost_core::{
    get_env_optional, parse_env, AppConfigTrait, ConfigError, ConfigSource,
};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `None` means no PostgreSQL backend is configured
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

impl AppConfigTrait for DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            url: get_env_optional("DATABASE_URL"),
            max_connections: parse_env(
                "DATABASE_MAX_CONNECTIONS",
                "max_connections",
                defaults.max_connections,
                "positive integer",
            )?,
            min_connections: parse_env(
                "DATABASE_MIN_CONNECTIONS",
                "min_connections",
                defaults.min_connections,
                "non-negative integer",
            )?,
            acquire_timeout_seconds: parse_env(
                "DATABASE_ACQUIRE_TIMEOUT",
                "acquire_timeout_seconds",
                defaults.acquire_timeout_seconds,
                "number of seconds",
            )?,
            idle_timeout_seconds: defaults.idle_timeout_seconds,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.url {
            let parsed = url::Url::parse(url).map_err(|_| {
                ConfigError::invalid_value("database_url", "<redacted>", "valid postgres:// URL")
            })?;
            if !matches!(parsed.scheme(), "postgres" | "postgresql") {
                return Err(ConfigError::invalid_value(
                    "database_url",
                    parsed.scheme(),
                    "postgres or postgresql scheme",
                ));
            }
        }
        if self.max_connections == 0 {
            return Err(ConfigError::validation_failed(
                "max_connections",
                "Pool needs at least one connection",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::validation_failed(
                "min_connections",
                "Cannot exceed max_connections",
            ));
        }
        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        sources.insert(
            "url".to_string(),
            ConfigSource::EnvVar("DATABASE_URL".to_string()),
        );
        sources.insert(
            "max_connections".to_string(),
            ConfigSource::EnvVar("DATABASE_MAX_CONNECTIONS".to_string()),
        );
        sources.insert(
            "min_connections".to_string(),
            ConfigSource::EnvVar("DATABASE_MIN_CONNECTIONS".to_string()),
        );
        sources.insert(
            "acquire_timeout_seconds".to_string(),
            ConfigSource::EnvVar("DATABASE_ACQUIRE_TIMEOUT".to_string()),
        );
        sources
    }
}
