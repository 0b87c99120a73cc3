//! E-mail delivery settings

use inkpost_core::{
    get_env_optional, get_env_or_default, parse_env, AppConfigTrait, ConfigError, ConfigSource,
};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpTlsConfig {
    /// Plain connection
    None,
    /// Upgrade with STARTTLS, required
    #[default]
    StartTls,
    /// Implicit TLS (port 465)
    Tls,
}

impl FromStr for SmtpTlsConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "starttls" => Ok(Self::StartTls),
            "tls" | "ssl" => Ok(Self::Tls),
            _ => Err(ConfigError::invalid_value("smtp_tls", s, "none, starttls or tls")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: SmtpTlsConfig,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub from_email: String,
    pub from_name: String,
    /// `None` selects the in-memory provider
    pub smtp: Option<SmtpConfig>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from_email: "noreply@localhost".to_string(),
            from_name: "Inkpost".to_string(),
            smtp: None,
        }
    }
}

impl EmailConfig {
    /// Formatted sender mailbox, `Name <address>`
    pub fn from_mailbox(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }
}

impl AppConfigTrait for EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let smtp = match get_env_optional("SMTP_HOST") {
            None => None,
            Some(host) => {
                let port = parse_env("SMTP_PORT", "smtp_port", 587u16, "valid port number")?;
                let default_tls = if port == 465 { "tls" } else { "starttls" };
                Some(SmtpConfig {
                    host,
                    port,
                    username: get_env_optional("SMTP_USER"),
                    password: get_env_optional("SMTP_PASS"),
                    tls: get_env_or_default("SMTP_TLS", default_tls).parse()?,
                    timeout_secs: parse_env(
                        "SMTP_TIMEOUT",
                        "smtp_timeout",
                        30u64,
                        "number of seconds",
                    )?,
                })
            }
        };

        Ok(Self {
            from_email: get_env_or_default("FROM_EMAIL", &defaults.from_email),
            from_name: get_env_or_default("FROM_NAME", &defaults.from_name),
            smtp,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.from_email.contains('@') {
            return Err(ConfigError::invalid_value(
                "from_email",
                &self.from_email,
                "an e-mail address",
            ));
        }
        if let Some(smtp) = &self.smtp {
            if smtp.username.is_some() != smtp.password.is_some() {
                return Err(ConfigError::validation_failed(
                    "smtp_user",
                    "SMTP_USER and SMTP_PASS must be set together",
                ));
            }
            if smtp.port == 0 {
                return Err(ConfigError::invalid_value("smtp_port", "0", "valid port number"));
            }
        }
        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        for (field, var) in [
            ("from_email", "FROM_EMAIL"),
            ("from_name", "FROM_NAME"),
            ("smtp_host", "SMTP_HOST"),
            ("smtp_port", "SMTP_PORT"),
            ("smtp_user", "SMTP_USER"),
            ("smtp_pass", "SMTP_PASS"),
            ("smtp_tls", "SMTP_TLS"),
        ] {
            sources.insert(field.to_string(), ConfigSource::EnvVar(var.to_string()));
        }
        sources
    }
}
