//! Authentication settings

use crate::{HashAlgorithm, SessionId};
use inkpost_core::{
    get_env_optional, get_env_or_default, parse_env, parse_env_bool, AppConfigTrait, ConfigError,
    ConfigSource,
};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Cookie SameSite attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for CookieSameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookieSameSite::Strict => write!(f, "Strict"),
            CookieSameSite::Lax => write!(f, "Lax"),
            CookieSameSite::None => write!(f, "None"),
        }
    }
}

impl FromStr for CookieSameSite {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "none" => Ok(Self::None),
            _ => Err(ConfigError::invalid_value(
                "session_cookie_same_site",
                s,
                "Strict, Lax or None",
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_secs: u64,
    pub cookie_name: String,
    pub cookie_domain: Option<String>,
    pub cookie_path: String,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
    pub cookie_same_site: CookieSameSite,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 7 * 24 * 3600,
            cookie_name: "inkpost_session".to_string(),
            cookie_domain: None,
            cookie_path: "/".to_string(),
            cookie_secure: false,
            cookie_http_only: true,
            cookie_same_site: CookieSameSite::Lax,
        }
    }
}

impl SessionConfig {
    /// `Set-Cookie` value issuing `session_id`
    pub fn cookie_header(&self, session_id: &SessionId) -> String {
        self.build_cookie(session_id.as_str(), self.ttl_secs)
    }

    /// `Set-Cookie` value that clears the session cookie
    pub fn clear_cookie_header(&self) -> String {
        self.build_cookie("", 0)
    }

    fn build_cookie(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!("{}={}", self.cookie_name, value);
        if let Some(domain) = &self.cookie_domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }
        cookie.push_str(&format!("; Path={}", self.cookie_path));
        if self.cookie_http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.cookie_same_site));
        cookie.push_str(&format!("; Max-Age={}", max_age));
        cookie
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub session: SessionConfig,
    /// Whether `POST /auth/signup` is open
    pub allow_signup: bool,
    pub hash_algorithm: HashAlgorithm,
}

impl AppConfigTrait for AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = SessionConfig::default();
        let hasher = get_env_or_default("PASSWORD_HASHER", "argon2");
        let hash_algorithm = hasher.parse().map_err(|_| {
            ConfigError::invalid_value("password_hasher", &hasher, "argon2 or bcrypt")
        })?;

        Ok(Self {
            session: SessionConfig {
                ttl_secs: parse_env(
                    "SESSION_TTL_SECS",
                    "session_ttl_secs",
                    defaults.ttl_secs,
                    "number of seconds",
                )?,
                cookie_name: get_env_or_default("SESSION_COOKIE_NAME", &defaults.cookie_name),
                cookie_domain: get_env_optional("SESSION_COOKIE_DOMAIN"),
                cookie_path: defaults.cookie_path,
                cookie_secure: parse_env_bool(
                    "SESSION_COOKIE_SECURE",
                    "session_cookie_secure",
                    defaults.cookie_secure,
                )?,
                cookie_http_only: true,
                cookie_same_site: get_env_or_default("SESSION_COOKIE_SAME_SITE", "Lax").parse()?,
            },
            allow_signup: parse_env_bool("ALLOW_SIGNUP", "allow_signup", false)?,
            hash_algorithm,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.ttl_secs == 0 {
            return Err(ConfigError::invalid_value(
                "session_ttl_secs",
                "0",
                "a positive number of seconds",
            ));
        }
        let name_ok = !self.session.cookie_name.is_empty()
            && self
                .session
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !name_ok {
            return Err(ConfigError::invalid_value(
                "session_cookie_name",
                &self.session.cookie_name,
                "letters, digits, '_' or '-'",
            ));
        }
        if self.session.cookie_same_site == CookieSameSite::None && !self.session.cookie_secure {
            return Err(ConfigError::validation_failed(
                "session_cookie_same_site",
                "SameSite=None requires SESSION_COOKIE_SECURE=true",
            ));
        }
        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        for (field, var) in [
            ("session_ttl_secs", "SESSION_TTL_SECS"),
            ("session_cookie_name", "SESSION_COOKIE_NAME"),
            ("session_cookie_secure", "SESSION_COOKIE_SECURE"),
            ("session_cookie_same_site", "SESSION_COOKIE_SAME_SITE"),
            ("allow_signup", "ALLOW_SIGNUP"),
            ("password_hasher", "PASSWORD_HASHER"),
        ] {
            sources.insert(field.to_string(), ConfigSource::EnvVar(var.to_string()));
        }
        sources.insert("session_cookie_path".to_string(), ConfigSource::Default("/".to_string()));
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "SESSION_TTL_SECS",
        "SESSION_COOKIE_NAME",
        "SESSION_COOKIE_SECURE",
        "SESSION_COOKIE_SAME_SITE",
        "ALLOW_SIGNUP",
        "PASSWORD_HASHER",
    ];

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = AuthConfig::from_env().unwrap();
        assert!(!config.allow_signup);
        assert_eq!(config.hash_algorithm, HashAlgorithm::Argon2);
        assert_eq!(config.session.cookie_name, "inkpost_session");
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_invalid_values_name_the_field() {
        clear();
        std::env::set_var("SESSION_TTL_SECS", "forever");
        let err = AuthConfig::from_env().unwrap_err();
        assert_eq!(err.field(), "session_ttl_secs");
        clear();

        std::env::set_var("PASSWORD_HASHER", "md5");
        let err = AuthConfig::from_env().unwrap_err();
        assert_eq!(err.field(), "password_hasher");
        clear();
    }

    #[test]
    fn test_cookie_headers() {
        let config = SessionConfig {
            cookie_secure: true,
            ttl_secs: 60,
            ..Default::default()
        };
        let id = SessionId::generate();
        let header = config.cookie_header(&id);
        assert!(header.starts_with(&format!("inkpost_session={}", id)));
        assert!(header.contains("; HttpOnly"));
        assert!(header.contains("; Secure"));
        assert!(header.contains("; SameSite=Lax"));
        assert!(header.ends_with("; Max-Age=60"));

        assert!(config.clear_cookie_header().contains("Max-Age=0"));
    }

    #[test]
    fn test_same_site_none_requires_secure() {
        let mut config = AuthConfig::default();
        config.session.cookie_same_site = CookieSameSite::None;
        assert!(config.validate().is_err());
        config.session.cookie_secure = true;
        assert!(config.validate().is_ok());
    }
}
