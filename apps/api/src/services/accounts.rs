//! User registration and credential checks

use inkpost_auth::{verify_any, PasswordHasher};
use inkpost_http::{HttpError, HttpResult};
use inkpost_orm::{normalize_email, NewUser, Store, User};
use inkpost_validation::{
    EmailValidator, LengthValidator, PatternValidator, RequiredValidator, Rules,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

fn registration_rules() -> HttpResult<Rules> {
    static USERNAME: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let username = USERNAME
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$"))
        .clone()
        .map_err(|e| HttpError::internal(format!("Invalid username pattern: {}", e)))?;

    Ok(Rules::new()
        .field("email", RequiredValidator::new())
        .field("email", EmailValidator::new())
        .field("username", RequiredValidator::new())
        .field("username", LengthValidator::new().range(3, 50))
        .field(
            "username",
            PatternValidator::new(username)
                .message("username may only contain letters, digits, '_' and '-'"),
        )
        .field("password", RequiredValidator::new())
        .field("password", LengthValidator::new().range(8, 128))
        .field("full_name", LengthValidator::new().max(100)))
}

/// Validate, hash and store a new account
pub async fn register(
    store: &dyn Store,
    hasher: Arc<dyn PasswordHasher>,
    registration: Registration,
    is_admin: bool,
) -> HttpResult<User> {
    registration_rules()?.check_serialized(&registration).await?;

    let password = registration.password;
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash_password(&password))
        .await
        .map_err(|e| HttpError::internal(format!("Password hashing task failed: {}", e)))??;

    let user = store
        .create_user(NewUser {
            email: normalize_email(&registration.email),
            username: registration.username.trim().to_string(),
            password_hash,
            is_admin,
            full_name: registration
                .full_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        })
        .await
        .map_err(|e| match e {
            inkpost_orm::ModelError::Conflict(_) => {
                HttpError::conflict("An account with this email or username already exists")
            }
            other => other.into(),
        })?;

    info!(user_id = user.id, is_admin, "User registered");
    Ok(user)
}

/// The user owning `email` if `password` matches; `Unauthorized` otherwise
pub async fn authenticate(store: &dyn Store, email: &str, password: &str) -> HttpResult<User> {
    let Some(user) = store.find_user_by_email(&normalize_email(email)).await? else {
        return Err(HttpError::Unauthorized);
    };

    let hash = user.password_hash.clone();
    let password = password.to_string();
    let matches = tokio::task::spawn_blocking(move || verify_any(&password, &hash))
        .await
        .map_err(|e| HttpError::internal(format!("Password check task failed: {}", e)))??;

    if matches {
        Ok(user)
    } else {
        Err(HttpError::Unauthorized)
    }
}
