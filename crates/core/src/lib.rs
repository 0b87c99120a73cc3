//! Shared foundation for the inkpost workspace.
//!
//! Every crate that reads its settings from the environment implements
//! [`AppConfigTrait`] and reports failures through [`ConfigError`].

pub mod config;

pub use config::{
    get_env_optional, get_env_or_default, get_env_required, parse_env, parse_env_bool,
    AppConfigTrait, ConfigError, ConfigSource, Environment,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name used in logs and the health endpoint
pub const SERVICE_NAME: &str = "inkpost";
