use crate::extractors::{session_id, CurrentUser};
use crate::services::accounts::{self, Registration};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use inkpost_http::{HttpError, HttpResult, JsonBody};
use inkpost_orm::User;
use serde::{Deserialize, Serialize};
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn signup(
    State(state): State<AppState>,
    JsonBody(registration): JsonBody<Registration>,
) -> HttpResult<(StatusCode, Json<User>)> {
    if !state.config.auth.allow_signup {
        return Err(HttpError::forbidden("Signup is disabled"));
    }
    let user =
        accounts::register(state.store.as_ref(), state.hasher.clone(), registration, false).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    user: User,
    /// Same value as the session cookie, for `Authorization: Bearer` clients
    token: String,
    expires_at: DateTime<Utc>,
}

async fn login(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> HttpResult<Response> {
    let user =
        accounts::authenticate(state.store.as_ref(), &credentials.email, &credentials.password)
            .await?;
    let session = state.sessions.create(user.id).await?;
    info!(user_id = user.id, "User signed in");

    let cookie = state.config.auth.session.cookie_header(&session.id);
    let body = LoginResponse {
        user,
        token: session.id.to_string(),
        expires_at: session.expires_at,
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> HttpResult<Response> {
    if let Some(id) = session_id(&headers, &state.config.auth.session.cookie_name) {
        state.sessions.revoke(&id).await?;
    }
    info!(user_id = user.id, "User signed out");

    let cookie = state.config.auth.session.clear_cookie_header();
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response())
}

async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
