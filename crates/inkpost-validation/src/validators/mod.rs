//! Built-in validators

pub mod choice;
pub mod email;
pub mod length;
pub mod pattern;
pub mod required;

pub use choice::ChoiceValidator;
pub use email::EmailValidator;
pub use length::LengthValidator;
pub use pattern::PatternValidator;
pub use required::RequiredValidator;
