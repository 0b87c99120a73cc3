//! # inkpost-validation
//!
//! Field validation for incoming request bodies. Rules run against the
//! `serde_json::Value` form of a request, so the same rule set serves any
//! serializable payload.

pub mod error;
pub mod rules;
pub mod traits;
pub mod validators;

pub use error::{ValidationError, ValidationErrors, ValidationResult};
pub use rules::Rules;
pub use traits::{Validate, ValidationRule};

pub use validators::email::is_valid_email;
pub use validators::{
    choice::ChoiceValidator, email::EmailValidator, length::LengthValidator,
    pattern::PatternValidator, required::RequiredValidator,
};
