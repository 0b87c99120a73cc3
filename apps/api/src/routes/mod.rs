//! HTTP routes

mod analytics;
mod auth;
mod comments;
mod health;
mod posts;
mod subscribers;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/auth", auth::router())
        .nest("/posts", posts::router())
        .nest("/comments", comments::router())
        .nest("/subscribers", subscribers::router())
        .nest("/analytics", analytics::router())
}
