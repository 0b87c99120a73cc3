//! Shared handler state

use crate::config::ApiConfig;
use inkpost_auth::{PasswordHasher, SessionStore};
use inkpost_orm::Store;
use inkpost_queue::OutboxStore;
use std::sync::Arc;

/// Everything a request handler can reach. Cloned per request, so every
/// field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub outbox: Arc<dyn OutboxStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        outbox: Arc<dyn OutboxStore>,
        sessions: Arc<dyn SessionStore>,
        hasher: Arc<dyn PasswordHasher>,
        config: ApiConfig,
    ) -> Self {
        Self {
            store,
            outbox,
            sessions,
            hasher,
            config: Arc::new(config),
        }
    }
}
