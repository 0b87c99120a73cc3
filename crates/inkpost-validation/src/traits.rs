//! Core validation traits

use crate::error::ValidationResult;
use async_trait::async_trait;
use serde_json::Value;

/// A single rule applied to one field value
#[async_trait]
pub trait ValidationRule: Send + Sync {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()>;

    /// Get the validation rule name/type
    fn rule_name(&self) -> &'static str;
}

/// Implemented by request bodies that carry their own rule set
#[async_trait]
pub trait Validate: Send + Sync {
    async fn validate(&self) -> ValidationResult<()>;
}
