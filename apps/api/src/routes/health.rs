use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use inkpost_core::{SERVICE_NAME, VERSION};
use inkpost_http::{HttpError, HttpResult};
use serde_json::{json, Value};
use tracing::error;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> HttpResult<Json<Value>> {
    if let Err(e) = state.store.health_check().await {
        error!(error = %e, backend = state.store.backend_name(), "Store health check failed");
        return Err(HttpError::unavailable("Database is unreachable"));
    }
    Ok(Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": VERSION,
        "store": state.store.backend_name(),
    })))
}
