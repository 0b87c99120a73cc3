use crate::extractors::AdminUser;
use crate::services::analytics_summary::{self, AnalyticsSummary, VisitorSeries};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use inkpost_http::{ClientInfo, HttpError, HttpResult, JsonBody, QueryParams};
use inkpost_orm::{AnalyticsEvent, EventFilter, NewAnalyticsEvent};
use inkpost_validation::{LengthValidator, RequiredValidator, Rules};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(summary).post(record_event))
        .route("/visitors", get(visitors))
}

#[derive(Debug, Serialize, Deserialize)]
struct EventBody {
    #[serde(default)]
    event: String,
    post_id: Option<i64>,
    metadata: Option<Value>,
}

async fn record_event(
    State(state): State<AppState>,
    client: ClientInfo,
    JsonBody(body): JsonBody<EventBody>,
) -> HttpResult<(StatusCode, Json<AnalyticsEvent>)> {
    Rules::new()
        .field("event", RequiredValidator::new())
        .field("event", LengthValidator::new().max(100))
        .check_serialized(&body)
        .await?;
    if body.metadata.as_ref().is_some_and(|m| !m.is_object()) {
        return Err(HttpError::invalid_field("metadata", "metadata must be an object"));
    }

    let store = state.store.as_ref();
    // Events for unknown posts are kept, just not linked
    let post_id = match body.post_id {
        Some(id) => store.find_post_by_id(id).await?.map(|post| post.id),
        None => None,
    };

    let event = store
        .record_event(NewAnalyticsEvent {
            event: body.event.trim().to_string(),
            post_id,
            metadata: body.metadata,
            ip_address: client.ip,
            user_agent: client.user_agent,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Debug, Default, Deserialize)]
struct SummaryQuery {
    event: Option<String>,
    post_id: Option<i64>,
}

async fn summary(
    State(state): State<AppState>,
    _admin: AdminUser,
    QueryParams(query): QueryParams<SummaryQuery>,
) -> HttpResult<Json<AnalyticsSummary>> {
    let now = Utc::now();
    let filter = EventFilter {
        event: query.event,
        post_id: query.post_id,
    };
    let events = state
        .store
        .events_since(analytics_summary::summary_window_start(now), &filter)
        .await?;
    Ok(Json(analytics_summary::summarize(&events, now)))
}

async fn visitors(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> HttpResult<Json<VisitorSeries>> {
    let today = Utc::now().date_naive();
    let (from, to) = analytics_summary::series_window(today);
    let counts = state.store.daily_event_counts(from, to).await?;
    Ok(Json(analytics_summary::visitor_series(&counts, today)))
}
