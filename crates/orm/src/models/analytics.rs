use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only tracking record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AnalyticsEvent {
    pub id: i64,
    pub event: String,
    pub post_id: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    /// String field from the metadata object, if present
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct NewAnalyticsEvent {
    pub event: String,
    pub post_id: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event: Option<String>,
    pub post_id: Option<i64>,
}

impl EventFilter {
    pub fn matches(&self, event: &AnalyticsEvent) -> bool {
        self.event.as_ref().map_or(true, |name| &event.event == name)
            && self.post_id.map_or(true, |id| event.post_id == Some(id))
    }
}

/// Number of events recorded on one UTC day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}
