//! Email format validator

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            // ASCII local part and domain, TLD required, no leading/trailing dots
            Regex::new(
                r"^[a-zA-Z0-9]([a-zA-Z0-9._%+-]*[a-zA-Z0-9])?@[a-zA-Z0-9]([a-zA-Z0-9.-]*[a-zA-Z0-9])?\.[a-zA-Z]{2,}$",
            )
        })
        .as_ref()
        .ok()
}

/// Returns true when `value` looks like a deliverable address
pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    value.len() <= 254
        && !value.contains("..")
        && email_pattern().is_some_and(|pattern| pattern.is_match(value))
}

/// Validator for email address format
#[derive(Debug, Clone, Default)]
pub struct EmailValidator {
    pub message: Option<String>,
}

impl EmailValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[async_trait]
impl ValidationRule for EmailValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        let valid = match value {
            Value::Null => return Ok(()),
            Value::String(s) => is_valid_email(s),
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            let message = self
                .message
                .clone()
                .unwrap_or_else(|| format!("{} must be a valid email address", field));
            Err(ValidationError::with_code(field, message, "email").into())
        }
    }

    fn rule_name(&self) -> &'static str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("reader@example.com"));
        assert!(is_valid_email(" first.last+news@mail.example.org "));
        assert!(!is_valid_email("reader@example"));
        assert!(!is_valid_email("reader@@example.com"));
        assert!(!is_valid_email("first..last@example.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[tokio::test]
    async fn test_validator_rejects_non_strings() {
        let validator = EmailValidator::new();
        assert!(validator.validate(&json!(null), "email").await.is_ok());
        assert!(validator.validate(&json!(12), "email").await.is_err());
        assert!(validator.validate(&json!("nope"), "email").await.is_err());
    }
}
