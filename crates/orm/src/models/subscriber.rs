use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of subscribing an address
#[derive(Debug, Clone, PartialEq)]
pub enum SubscribeOutcome {
    Created(Subscriber),
    Reactivated(Subscriber),
    AlreadyActive(Subscriber),
}

impl SubscribeOutcome {
    pub fn subscriber(&self) -> &Subscriber {
        match self {
            SubscribeOutcome::Created(s)
            | SubscribeOutcome::Reactivated(s)
            | SubscribeOutcome::AlreadyActive(s) => s,
        }
    }

    pub fn into_subscriber(self) -> Subscriber {
        match self {
            SubscribeOutcome::Created(s)
            | SubscribeOutcome::Reactivated(s)
            | SubscribeOutcome::AlreadyActive(s) => s,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SubscribeOutcome::Created(_))
    }
}

/// Subscriber addresses are stored trimmed and lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
