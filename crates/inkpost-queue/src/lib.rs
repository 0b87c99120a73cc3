//! # inkpost-queue
//!
//! A transactional-outbox style job table. Request handlers enqueue side
//! effects (e-mails) keyed by a dedupe key; the [`Dispatcher`] polls due
//! entries, runs the handler registered for their kind and records the
//! outcome with exponential backoff between attempts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub mod backends;
pub mod config;
pub mod worker;

pub use backends::{MemoryOutbox, PostgresOutbox};
pub use config::QueueConfig;
pub use worker::{DispatchReport, Dispatcher, HandlerRegistry, OutboxHandler};

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Outbox entry not found: {0}")]
    EntryNotFound(Uuid),

    #[error("Queue configuration error: {0}")]
    Configuration(String),

    #[error("Timeout error")]
    Timeout,
}

impl From<sqlx::Error> for QueueError {
    fn from(err: sqlx::Error) -> Self {
        QueueError::Backend(err.to_string())
    }
}

pub type QueueResult<T> = Result<T, QueueError>;

/// Result type for handler execution
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub type EntryId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxState {
    /// Waiting for its first attempt
    Pending,
    /// Delivered
    Sent,
    /// Failed, retry scheduled at `run_at`
    Failed,
    /// Failed permanently after max attempts
    Dead,
}

impl OutboxState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxState::Pending => "pending",
            OutboxState::Sent => "sent",
            OutboxState::Failed => "failed",
            OutboxState::Dead => "dead",
        }
    }
}

impl TryFrom<String> for OutboxState {
    type Error = QueueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(OutboxState::Pending),
            "sent" => Ok(OutboxState::Sent),
            "failed" => Ok(OutboxState::Failed),
            "dead" => Ok(OutboxState::Dead),
            other => Err(QueueError::Backend(format!("unknown outbox state '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxEntry {
    pub id: EntryId,
    /// Routes the entry to a registered handler
    pub kind: String,
    pub dedupe_key: String,
    pub payload: serde_json::Value,
    #[sqlx(try_from = "String")]
    pub state: OutboxState,
    /// Attempts started so far, including one in flight
    pub attempts: i32,
    pub max_attempts: i32,
    pub run_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.state, OutboxState::Pending | OutboxState::Failed) && self.run_at <= now
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Entry to enqueue
#[derive(Debug, Clone)]
pub struct NewOutboxEntry {
    pub kind: String,
    pub dedupe_key: String,
    pub payload: serde_json::Value,
    pub max_attempts: i32,
    pub run_at: DateTime<Utc>,
}

impl NewOutboxEntry {
    pub fn new<P: Serialize>(
        kind: impl Into<String>,
        dedupe_key: impl Into<String>,
        payload: &P,
    ) -> QueueResult<Self> {
        Ok(Self {
            kind: kind.into(),
            dedupe_key: dedupe_key.into(),
            payload: serde_json::to_value(payload)?,
            max_attempts: config::DEFAULT_MAX_ATTEMPTS,
            run_at: Utc::now(),
        })
    }

    pub fn max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub(crate) fn into_entry(self) -> OutboxEntry {
        OutboxEntry {
            id: Uuid::new_v4(),
            kind: self.kind,
            dedupe_key: self.dedupe_key,
            payload: self.payload,
            state: OutboxState::Pending,
            attempts: 0,
            max_attempts: self.max_attempts,
            run_at: self.run_at,
            last_error: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }
}

/// Delay before the next attempt: 2^attempt seconds, capped at 64s
pub fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt.min(6))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxStats {
    pub pending: u64,
    pub sent: u64,
    pub failed: u64,
    pub dead: u64,
}

impl OutboxStats {
    pub fn total(&self) -> u64 {
        self.pending + self.sent + self.failed + self.dead
    }
}

/// Durable storage for outbox entries
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Insert unless an entry with the same dedupe key exists.
    /// Returns whether a new entry was created.
    async fn enqueue(&self, entry: NewOutboxEntry) -> QueueResult<bool>;

    /// Lease up to `limit` due entries: bumps `attempts` and pushes `run_at`
    /// forward by `lease` so concurrent dispatchers skip them.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        lease: Duration,
    ) -> QueueResult<Vec<OutboxEntry>>;

    async fn mark_sent(&self, id: EntryId) -> QueueResult<()>;

    /// Record a failed attempt. `retry_at: None` marks the entry dead.
    async fn mark_failed(
        &self,
        id: EntryId,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> QueueResult<()>;

    async fn get(&self, id: EntryId) -> QueueResult<Option<OutboxEntry>>;

    async fn stats(&self) -> QueueResult<OutboxStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        assert_eq!(retry_delay(0), Duration::from_secs(1));
        assert_eq!(retry_delay(1), Duration::from_secs(2));
        assert_eq!(retry_delay(5), Duration::from_secs(32));
        assert_eq!(retry_delay(6), Duration::from_secs(64));
        assert_eq!(retry_delay(30), Duration::from_secs(64));
    }

    #[test]
    fn test_new_entry_defaults() {
        let entry = NewOutboxEntry::new("welcome", "welcome:7", &serde_json::json!({"to": "a@b.co"}))
            .unwrap()
            .max_attempts(0)
            .into_entry();
        assert_eq!(entry.state, OutboxState::Pending);
        assert_eq!(entry.attempts, 0);
        assert_eq!(entry.max_attempts, 1);
        assert!(entry.is_due(Utc::now()));
    }

    #[test]
    fn test_state_text() {
        for state in [
            OutboxState::Pending,
            OutboxState::Sent,
            OutboxState::Failed,
            OutboxState::Dead,
        ] {
            assert_eq!(OutboxState::try_from(state.as_str().to_string()).unwrap(), state);
        }
        assert!(OutboxState::try_from("processing".to_string()).is_err());
    }
}
