//! HTTP error types
//!
//! Every failure that reaches a handler boundary becomes an [`HttpError`],
//! rendered as `{"error": {"code", "message", "hint", "fields"?}}`.
//! Internal failures are logged with their detail and answered with an
//! opaque message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use inkpost_auth::AuthError;
use inkpost_orm::ModelError;
use inkpost_queue::QueueError;
use inkpost_validation::ValidationErrors;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

pub type HttpResult<T> = Result<T, HttpError>;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Server startup failed: {message}")]
    StartupFailed { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Access forbidden: {message}")]
    Forbidden { message: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Resource already exists: {message}")]
    Conflict { message: String },

    #[error("{message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Request body too large")]
    RequestTooLarge,

    #[error("Service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl HttpError {
    pub fn startup<T: Into<String>>(message: T) -> Self {
        HttpError::StartupFailed {
            message: message.into(),
        }
    }

    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        HttpError::BadRequest {
            message: message.into(),
        }
    }

    pub fn forbidden<T: Into<String>>(message: T) -> Self {
        HttpError::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found<T: Into<String>>(resource: T) -> Self {
        HttpError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict<T: Into<String>>(message: T) -> Self {
        HttpError::Conflict {
            message: message.into(),
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut fields = BTreeMap::new();
        fields.insert(field.into(), vec![message.clone()]);
        HttpError::Validation { message, fields }
    }

    pub fn unavailable<T: Into<String>>(reason: T) -> Self {
        HttpError::ServiceUnavailable {
            reason: reason.into(),
        }
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        HttpError::InternalError {
            message: message.into(),
        }
    }

    /// Get error code for consistent API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            HttpError::StartupFailed { .. } => "SERVER_STARTUP_FAILED",
            HttpError::ConfigError { .. } => "CONFIGURATION_ERROR",
            HttpError::BadRequest { .. } => "BAD_REQUEST",
            HttpError::Unauthorized => "UNAUTHORIZED_ACCESS",
            HttpError::Forbidden { .. } => "ACCESS_FORBIDDEN",
            HttpError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            HttpError::Conflict { .. } => "RESOURCE_CONFLICT",
            HttpError::Validation { .. } => "VALIDATION_ERROR",
            HttpError::RequestTimeout => "REQUEST_TIMEOUT",
            HttpError::RequestTooLarge => "REQUEST_TOO_LARGE",
            HttpError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            HttpError::InternalError { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            HttpError::StartupFailed { .. }
            | HttpError::ConfigError { .. }
            | HttpError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            HttpError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            HttpError::Unauthorized => StatusCode::UNAUTHORIZED,
            HttpError::Forbidden { .. } => StatusCode::FORBIDDEN,
            HttpError::NotFound { .. } => StatusCode::NOT_FOUND,
            HttpError::Conflict { .. } => StatusCode::CONFLICT,
            HttpError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            HttpError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            HttpError::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            HttpError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get error hint for user guidance
    pub fn error_hint(&self) -> Option<&'static str> {
        match self {
            HttpError::Unauthorized => Some("Log in and retry with the session cookie"),
            HttpError::Forbidden { .. } => Some("This operation requires an administrator"),
            HttpError::BadRequest { .. } => Some("Check request format and parameters"),
            HttpError::Validation { .. } => Some("Fix the listed fields and resubmit"),
            HttpError::RequestTooLarge => Some("Reduce request payload size"),
            HttpError::RequestTimeout => Some("Retry the request"),
            HttpError::ServiceUnavailable { .. } => {
                Some("Server may be starting up or experiencing issues")
            }
            _ => None,
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Message safe to show to clients
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_internal() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }

        let mut error = json!({
            "code": self.error_code(),
            "message": self.public_message(),
            "hint": self.error_hint(),
        });
        if let HttpError::Validation { fields, .. } = &self {
            if !fields.is_empty() {
                error["fields"] = json!(fields);
            }
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

impl From<ModelError> for HttpError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotFound(what) => HttpError::NotFound { resource: what },
            ModelError::Conflict(message) => HttpError::Conflict { message },
            ModelError::Validation(message) => HttpError::Validation {
                message,
                fields: BTreeMap::new(),
            },
            other => HttpError::internal(other.to_string()),
        }
    }
}

impl From<AuthError> for HttpError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::SessionError { .. } => HttpError::Unauthorized,
            AuthError::AccessDenied { message } => HttpError::Forbidden { message },
            other => HttpError::internal(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for HttpError {
    fn from(errors: ValidationErrors) -> Self {
        HttpError::Validation {
            message: "Validation failed".to_string(),
            fields: errors.field_messages(),
        }
    }
}

impl From<QueueError> for HttpError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::EntryNotFound(id) => HttpError::not_found(format!("Outbox entry {}", id)),
            other => HttpError::internal(other.to_string()),
        }
    }
}

impl From<inkpost_core::ConfigError> for HttpError {
    fn from(err: inkpost_core::ConfigError) -> Self {
        HttpError::ConfigError {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        HttpError::internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::internal(format!("JSON serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_of(error: HttpError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_internal_errors_are_opaque() {
        let (status, body) = body_of(HttpError::internal("connection refused on 10.0.0.5")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_validation_errors_carry_fields() {
        let mut errors = ValidationErrors::new();
        errors.add_error("email", "email must be a valid email address");
        let (status, body) = body_of(errors.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(
            body["error"]["fields"]["email"][0],
            "email must be a valid email address"
        );
    }

    #[tokio::test]
    async fn test_model_error_mapping() {
        let (status, body) = body_of(ModelError::NotFound("Post".into()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "RESOURCE_NOT_FOUND");
        assert_eq!(body["error"]["message"], "Post not found");
        assert!(body["error"].get("fields").is_none());

        let conflict: HttpError = ModelError::Conflict("slug taken".into()).into();
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let db: HttpError = ModelError::Database("syntax error".into()).into();
        assert_eq!(db.public_message(), "Internal server error");
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(
            HttpError::from(AuthError::session_error("expired")).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            HttpError::from(AuthError::access_denied("admins only")).error_code(),
            "ACCESS_FORBIDDEN"
        );
    }
}
