//! Structured logging setup

use inkpost_core::{get_env_optional, ConfigError, Environment};
use std::io;
use std::str::FromStr;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Plain,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "plain" | "text" => Ok(Self::Plain),
            _ => Err(ConfigError::invalid_value("log_format", s, "json, pretty or plain")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    pub format: LogFormat,
    /// Include file and line number information
    pub include_location: bool,
    /// Directive string, overridden by `RUST_LOG` when set
    pub env_filter: Option<String>,
    pub service_name: Option<String>,
    pub service_version: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_location: false,
            env_filter: None,
            service_name: None,
            service_version: None,
        }
    }
}

impl LoggingConfig {
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            include_location: false,
            env_filter: Some("inkpost=info,tower_http=info,sqlx=warn,axum=warn".to_string()),
            service_name: None,
            service_version: None,
        }
    }

    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            env_filter: Some("inkpost=debug,tower_http=debug,sqlx=info,axum=debug".to_string()),
            service_name: None,
            service_version: None,
        }
    }

    /// Create test logging configuration (minimal output)
    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            format: LogFormat::Plain,
            include_location: false,
            env_filter: Some("inkpost=error".to_string()),
            service_name: None,
            service_version: None,
        }
    }

    /// Preset for `environment`, with `LOG_FORMAT` overriding the output format
    pub fn for_environment(environment: Environment) -> Result<Self, ConfigError> {
        let mut config = if environment.is_production() {
            Self::production()
        } else if environment.is_testing() {
            Self::test()
        } else {
            Self::development()
        };
        if let Some(format) = get_env_optional("LOG_FORMAT") {
            config.format = format.parse()?;
        }
        Ok(config)
    }

    pub fn with_service(mut self, name: &str, version: &str) -> Self {
        self.service_name = Some(name.to_string());
        self.service_version = Some(version.to_string());
        self
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let directives = config.env_filter.as_deref().unwrap_or(&config.level);
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directives))?;

    let layer = Layer::new()
        .with_writer(io::stdout)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(layer.pretty())
            .try_init()?,
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?,
    }

    tracing::info!(
        target: "inkpost::logging",
        level = %config.level,
        format = ?config.format,
        service = config.service_name.as_deref().unwrap_or("unknown"),
        version = config.service_version.as_deref().unwrap_or("unknown"),
        "Structured logging initialized"
    );
    Ok(())
}

/// Log application startup with system information
pub fn log_startup_info(service_name: &str, service_version: &str, environment: Environment) {
    tracing::info!(
        target: "inkpost::startup",
        event = "application_startup",
        service = service_name,
        version = service_version,
        environment = %environment,
        pid = std::process::id(),
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        timestamp = %chrono::Utc::now().to_rfc3339(),
    );
}

pub fn log_shutdown_info(service_name: &str) {
    tracing::info!(
        target: "inkpost::shutdown",
        event = "application_shutdown",
        service = service_name,
        timestamp = %chrono::Utc::now().to_rfc3339(),
    );
}
