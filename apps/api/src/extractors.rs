//! Session-backed user extractors

use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use axum_extra::extract::CookieJar;
use inkpost_auth::SessionId;
use inkpost_http::HttpError;
use inkpost_orm::User;

/// Session id from the session cookie, or from an `Authorization: Bearer`
/// header for non-browser clients
pub fn session_id(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    let jar = CookieJar::from_headers(headers);
    jar.get(cookie_name)
        .and_then(|cookie| SessionId::from_string(cookie.value()).ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .and_then(|token| SessionId::from_string(token.trim()).ok())
        })
}

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<Option<User>, HttpError> {
    let Some(id) = session_id(&parts.headers, &state.config.auth.session.cookie_name) else {
        return Ok(None);
    };
    let Some(session) = state.sessions.get(&id).await? else {
        return Ok(None);
    };
    Ok(state.store.find_user_by_id(session.user_id).await?)
}

/// Any signed-in user; 401 otherwise
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_user(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or(HttpError::Unauthorized)
    }
}

/// Signed-in administrator; 401 without a session, 403 for other users
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(HttpError::forbidden("Administrator access required"));
        }
        Ok(AdminUser(user))
    }
}

/// The signed-in user, if any. Never rejects for a missing or stale session.
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(|user| user.is_admin)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve_user(parts, state).await?))
    }
}
