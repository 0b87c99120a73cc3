//! Application configuration assembled from every crate's settings

use inkpost_auth::AuthConfig;
use inkpost_core::{
    get_env_or_default, parse_env_bool, AppConfigTrait, ConfigError, ConfigSource, Environment,
};
use inkpost_email::EmailConfig;
use inkpost_http::HttpConfig;
use inkpost_orm::DatabaseConfig;
use inkpost_queue::QueueConfig;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub name: String,
    /// Public URL of the site, used for links in e-mails
    pub url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Inkpost".to_string(),
            url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    pub environment: Environment,
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub queue: QueueConfig,
    pub site: SiteConfig,
    /// New comments start as `pending` instead of `approved`
    pub comments_require_approval: bool,
}

impl ApiConfig {
    /// Load and validate everything
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::from_env()?;
        config.validate()?;
        Ok(config)
    }
}

impl AppConfigTrait for ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let site_defaults = SiteConfig::default();
        Ok(Self {
            environment: Environment::from_env()?,
            http: HttpConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            email: EmailConfig::from_env()?,
            queue: QueueConfig::from_env()?,
            site: SiteConfig {
                name: get_env_or_default("SITE_NAME", &site_defaults.name),
                url: get_env_or_default("SITE_URL", &site_defaults.url),
            },
            comments_require_approval: parse_env_bool(
                "COMMENTS_REQUIRE_APPROVAL",
                "comments_require_approval",
                false,
            )?,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.http.validate()?;
        self.database.validate()?;
        self.auth.validate()?;
        self.email.validate()?;
        self.queue.validate()?;

        let url = url::Url::parse(&self.site.url)
            .map_err(|_| ConfigError::invalid_value("site_url", &self.site.url, "absolute URL"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid_value(
                "site_url",
                &self.site.url,
                "http or https URL",
            ));
        }
        if self.environment.is_production() && !self.auth.session.cookie_secure {
            tracing::warn!("SESSION_COOKIE_SECURE is off in production");
        }
        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        sources.insert("environment".to_string(), ConfigSource::EnvVar("APP_ENV".to_string()));
        sources.insert("site_name".to_string(), ConfigSource::EnvVar("SITE_NAME".to_string()));
        sources.insert("site_url".to_string(), ConfigSource::EnvVar("SITE_URL".to_string()));
        sources.insert(
            "comments_require_approval".to_string(),
            ConfigSource::EnvVar("COMMENTS_REQUIRE_APPROVAL".to_string()),
        );
        for nested in ["http", "database", "auth", "email", "queue"] {
            sources.insert(nested.to_string(), ConfigSource::Nested);
        }
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_site_url_must_be_http() {
        std::env::set_var("SITE_URL", "ftp://example.com");
        let config = ApiConfig::from_env().unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), "site_url");
        std::env::remove_var("SITE_URL");
    }

    #[test]
    #[serial]
    fn test_comment_approval_flag() {
        std::env::set_var("COMMENTS_REQUIRE_APPROVAL", "yes");
        assert!(ApiConfig::from_env().unwrap().comments_require_approval);
        std::env::set_var("COMMENTS_REQUIRE_APPROVAL", "maybe");
        assert!(ApiConfig::from_env().is_err());
        std::env::remove_var("COMMENTS_REQUIRE_APPROVAL");
    }
}
