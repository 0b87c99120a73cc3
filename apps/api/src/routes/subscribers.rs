use crate::extractors::AdminUser;
use crate::services::notifications;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use inkpost_http::{HttpError, HttpResult, JsonBody};
use inkpost_orm::{SubscribeOutcome, Subscriber};
use inkpost_validation::{EmailValidator, RequiredValidator, Rules};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscribers).post(subscribe))
        .route("/count", get(count_subscribers))
        .route("/unsubscribe", post(unsubscribe))
        .route("/:id", delete(delete_subscriber))
}

#[derive(Debug, Serialize, Deserialize)]
struct EmailBody {
    #[serde(default)]
    email: String,
}

async fn validate_email(body: &EmailBody) -> HttpResult<()> {
    Rules::new()
        .field("email", RequiredValidator::new())
        .field("email", EmailValidator::new())
        .check_serialized(body)
        .await?;
    Ok(())
}

async fn list_subscribers(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> HttpResult<Json<Vec<Subscriber>>> {
    Ok(Json(state.store.list_active_subscribers().await?))
}

async fn count_subscribers(State(state): State<AppState>) -> HttpResult<Json<Value>> {
    let count = state.store.count_active_subscribers().await?;
    Ok(Json(json!({ "count": count })))
}

#[derive(Debug, Serialize)]
struct SubscribeResponse {
    status: &'static str,
    message: &'static str,
    subscriber: Subscriber,
}

async fn subscribe(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<EmailBody>,
) -> HttpResult<(StatusCode, Json<SubscribeResponse>)> {
    validate_email(&body).await?;

    let outcome = state.store.upsert_subscriber(&body.email).await?;
    let (code, status, message) = match &outcome {
        SubscribeOutcome::Created(subscriber) => {
            info!(subscriber_id = subscriber.id, "New subscriber");
            notifications::queue_welcome(
                state.outbox.as_ref(),
                state.config.queue.max_attempts,
                subscriber,
            )
            .await;
            (StatusCode::CREATED, "created", "Thanks for subscribing!")
        }
        SubscribeOutcome::Reactivated(subscriber) => {
            info!(subscriber_id = subscriber.id, "Subscriber reactivated");
            (StatusCode::OK, "reactivated", "Welcome back! Your subscription is active again.")
        }
        SubscribeOutcome::AlreadyActive(_) => {
            (StatusCode::OK, "already_subscribed", "You are already subscribed.")
        }
    };

    Ok((
        code,
        Json(SubscribeResponse {
            status,
            message,
            subscriber: outcome.into_subscriber(),
        }),
    ))
}

async fn unsubscribe(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<EmailBody>,
) -> HttpResult<Json<Value>> {
    validate_email(&body).await?;

    let subscriber = state
        .store
        .deactivate_subscriber(&body.email)
        .await?
        .ok_or_else(|| HttpError::not_found("Subscriber"))?;
    info!(subscriber_id = subscriber.id, "Subscriber unsubscribed");
    Ok(Json(json!({ "message": "You have been unsubscribed." })))
}

async fn delete_subscriber(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> HttpResult<StatusCode> {
    if !state.store.delete_subscriber(id).await? {
        return Err(HttpError::not_found("Subscriber"));
    }
    info!(subscriber_id = id, admin_id = admin.id, "Subscriber deleted");
    Ok(StatusCode::NO_CONTENT)
}
