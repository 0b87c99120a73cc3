//! Validator restricting a string to a fixed set of values

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ChoiceValidator {
    pub choices: Vec<&'static str>,
}

impl ChoiceValidator {
    pub fn new(choices: &[&'static str]) -> Self {
        Self {
            choices: choices.to_vec(),
        }
    }
}

#[async_trait]
impl ValidationRule for ChoiceValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        match value {
            Value::Null => Ok(()),
            Value::String(s) if self.choices.contains(&s.as_str()) => Ok(()),
            _ => Err(ValidationError::with_code(
                field,
                format!("{} must be one of: {}", field, self.choices.join(", ")),
                "choice",
            )
            .into()),
        }
    }

    fn rule_name(&self) -> &'static str {
        "choice"
    }
}
