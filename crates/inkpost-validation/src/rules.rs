//! Rule sets applied to whole request bodies

use crate::error::{ValidationErrors, ValidationResult};
use crate::traits::ValidationRule;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Ordered collection of per-field rules
#[derive(Clone, Default)]
pub struct Rules {
    field_rules: Vec<(String, Vec<Arc<dyn ValidationRule>>)>,
}

impl std::fmt::Debug for Rules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rules")
            .field(
                "fields",
                &self.field_rules.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation rule for a specific field
    pub fn field<R>(mut self, field: impl Into<String>, rule: R) -> Self
    where
        R: ValidationRule + 'static,
    {
        let field = field.into();
        let rule: Arc<dyn ValidationRule> = Arc::new(rule);
        match self.field_rules.iter_mut().find(|(name, _)| *name == field) {
            Some((_, rules)) => rules.push(rule),
            None => self.field_rules.push((field, vec![rule])),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.field_rules.is_empty()
    }

    /// Run every rule against `data`, a JSON object. Missing fields are
    /// validated as `null`; all failures are collected.
    pub async fn check(&self, data: &Value) -> ValidationResult<()> {
        let mut errors = ValidationErrors::new();
        for (field, rules) in &self.field_rules {
            let value = data.get(field).unwrap_or(&Value::Null);
            for rule in rules {
                if let Err(rule_errors) = rule.validate(value, field).await {
                    errors.merge(rule_errors);
                }
            }
        }
        errors.into_result()
    }

    /// Serialize `payload` and check it
    pub async fn check_serialized<T: Serialize + ?Sized>(
        &self,
        payload: &T,
    ) -> ValidationResult<()> {
        let data = serde_json::to_value(payload).unwrap_or(Value::Null);
        self.check(&data).await
    }
}
