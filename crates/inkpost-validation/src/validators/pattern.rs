//! Regex pattern validator

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct PatternValidator {
    pub pattern: Regex,
    pub message: Option<String>,
}

impl PatternValidator {
    pub fn new(pattern: Regex) -> Self {
        Self {
            pattern,
            message: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[async_trait]
impl ValidationRule for PatternValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        let matches = match value {
            Value::Null => return Ok(()),
            Value::String(s) => self.pattern.is_match(s),
            _ => false,
        };

        if matches {
            Ok(())
        } else {
            let message = self
                .message
                .clone()
                .unwrap_or_else(|| format!("{} has an invalid format", field));
            Err(ValidationError::with_code(field, message, "pattern").into())
        }
    }

    fn rule_name(&self) -> &'static str {
        "pattern"
    }
}
