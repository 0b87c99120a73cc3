//! HTTP server configuration

use inkpost_core::{
    get_env_optional, get_env_or_default, parse_env, AppConfigTrait, ConfigError, ConfigSource,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
    /// Grace period for in-flight requests after a shutdown signal
    pub shutdown_timeout_secs: u64,
    /// Origins allowed by CORS; empty allows any origin
    pub cors_allowed_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_secs: 30,
            max_request_size: 1024 * 1024,
            shutdown_timeout_secs: 10,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse()
            .map_err(|_| ConfigError::invalid_value("server_host", &self.host, "an IP address"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl AppConfigTrait for HttpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: get_env_or_default("SERVER_HOST", &defaults.host),
            port: parse_env("SERVER_PORT", "server_port", defaults.port, "valid port number")?,
            request_timeout_secs: parse_env(
                "HTTP_REQUEST_TIMEOUT",
                "request_timeout_secs",
                defaults.request_timeout_secs,
                "valid number of seconds",
            )?,
            max_request_size: parse_env(
                "HTTP_MAX_REQUEST_SIZE",
                "max_request_size",
                defaults.max_request_size,
                "valid number of bytes",
            )?,
            shutdown_timeout_secs: parse_env(
                "HTTP_SHUTDOWN_TIMEOUT",
                "shutdown_timeout_secs",
                defaults.shutdown_timeout_secs,
                "valid number of seconds",
            )?,
            cors_allowed_origins: get_env_optional("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::validation_failed(
                "request_timeout_secs",
                "Request timeout must be greater than 0",
            ));
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::validation_failed(
                "shutdown_timeout_secs",
                "Shutdown timeout must be greater than 0",
            ));
        }
        if self.max_request_size == 0 {
            return Err(ConfigError::validation_failed(
                "max_request_size",
                "Maximum request size must be greater than 0",
            ));
        }
        self.socket_addr()?;
        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        for (field, var) in [
            ("server_host", "SERVER_HOST"),
            ("server_port", "SERVER_PORT"),
            ("request_timeout_secs", "HTTP_REQUEST_TIMEOUT"),
            ("max_request_size", "HTTP_MAX_REQUEST_SIZE"),
            ("shutdown_timeout_secs", "HTTP_SHUTDOWN_TIMEOUT"),
            ("cors_allowed_origins", "CORS_ALLOWED_ORIGINS"),
        ] {
            sources.insert(field.to_string(), ConfigSource::EnvVar(var.to_string()));
        }
        sources
    }
}
