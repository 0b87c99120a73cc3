//! Server-side sessions

use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use std::fmt;

const SESSION_ID_LEN: usize = 48;

/// Opaque random session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let id = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    /// Parse an id received from a client, rejecting anything we could not have issued
    pub fn from_string(value: impl Into<String>) -> AuthResult<Self> {
        let value = value.into();
        if value.len() != SESSION_ID_LEN || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AuthError::session_error("Malformed session id"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a new session for `user_id`
    async fn create(&self, user_id: i64) -> AuthResult<Session>;

    /// Live session for `id`; expired sessions are dropped and reported as missing
    async fn get(&self, id: &SessionId) -> AuthResult<Option<Session>>;

    async fn revoke(&self, id: &SessionId) -> AuthResult<()>;

    /// Remove every session belonging to `user_id`
    async fn revoke_user(&self, user_id: i64) -> AuthResult<u64>;

    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

/// Process-local session store
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, Session>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1000)),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user_id: i64) -> AuthResult<Session> {
        let now = Utc::now();
        let session = Session {
            id: SessionId::generate(),
            user_id,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.sessions.insert(session.id.clone(), session.clone());
        tracing::debug!(user_id, "session created");
        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> AuthResult<Option<Session>> {
        let now = Utc::now();
        let session = self.sessions.get(id).map(|entry| entry.value().clone());
        match session {
            Some(session) if session.is_expired(now) => {
                self.sessions.remove(id);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn revoke(&self, id: &SessionId) -> AuthResult<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn revoke_user(&self, user_id: i64) -> AuthResult<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.user_id != user_id);
        Ok((before - self.sessions.len()) as u64)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        let removed = (before - self.sessions.len()) as u64;
        if removed > 0 {
            tracing::debug!(removed, "expired sessions removed");
        }
        Ok(removed)
    }
}
