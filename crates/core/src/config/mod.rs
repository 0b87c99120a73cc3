mod app_config;
mod env;
mod validation;

pub use app_config::{AppConfigTrait, ConfigSource, Environment};
pub use env::{get_env_optional, get_env_or_default, get_env_required, parse_env, parse_env_bool};
pub use validation::ConfigError;
