//! Router assembly

use crate::routes;
use crate::state::AppState;
use axum::Router;
use inkpost_http::apply_middleware;

/// The full API with middleware applied, ready to serve
pub fn build_router(state: AppState) -> Router {
    let http = state.config.http.clone();
    let router = routes::router().with_state(state);
    apply_middleware(router, &http)
}
