use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}. {hint}")]
    MissingEnvVar { var: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration validation failed for '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },
}

impl ConfigError {
    /// Create a missing environment variable error
    pub fn missing_env_var(var: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingEnvVar {
            var: var.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the field or variable the error is about
    pub fn field(&self) -> &str {
        match self {
            Self::MissingEnvVar { var, .. } => var,
            Self::InvalidValue { field, .. } => field,
            Self::ValidationFailed { field, .. } => field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_message() {
        let err = ConfigError::invalid_value("port", "abc", "valid port number (1-65535)");
        assert_eq!(
            err.to_string(),
            "Invalid value for field 'port': 'abc'. Expected: valid port number (1-65535)"
        );
        assert_eq!(err.field(), "port");
    }

    #[test]
    fn test_missing_env_var_message() {
        let err = ConfigError::missing_env_var("DATABASE_URL", "Set it to a postgres:// URL");
        assert!(err.to_string().contains("DATABASE_URL"));
        assert!(err.to_string().contains("postgres://"));
    }
}
