//! Dispatcher that drains the outbox

use crate::{retry_delay, HandlerResult, OutboxEntry, OutboxStore, QueueConfig, QueueResult};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Type-erased handler for one entry kind
pub type OutboxHandler = Arc<dyn Fn(OutboxEntry) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Handlers keyed by entry kind
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, OutboxHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`; the payload is deserialized into `P`
    pub fn register<P, F, Fut>(&mut self, kind: impl Into<String>, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let kind = kind.into();
        let handler = Arc::new(handler);
        let erased: OutboxHandler = Arc::new(move |entry: OutboxEntry| {
            let handler = Arc::clone(&handler);
            async move {
                let payload: P = serde_json::from_value(entry.payload)?;
                handler(payload).await
            }
            .boxed()
        });
        info!("Registered outbox handler for kind: {}", kind);
        self.handlers.insert(kind, erased);
    }

    pub fn get(&self, kind: &str) -> Option<OutboxHandler> {
        self.handlers.get(kind).cloned()
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}

/// What one polling pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub retried: usize,
    pub dead: usize,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.sent + self.retried + self.dead
    }
}

enum Outcome {
    Sent,
    Retried,
    Dead,
}

pub struct Dispatcher {
    store: Arc<dyn OutboxStore>,
    registry: Arc<HandlerRegistry>,
    config: QueueConfig,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn OutboxStore>, registry: HandlerRegistry, config: QueueConfig) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            config,
        }
    }

    /// Claim one batch of due entries and process it
    pub async fn run_once(&self) -> QueueResult<DispatchReport> {
        let due = self
            .store
            .claim_due(Utc::now(), self.config.batch_size, self.config.lease)
            .await?;
        if due.is_empty() {
            return Ok(DispatchReport::default());
        }
        debug!("Claimed {} outbox entries", due.len());

        let outcomes: Vec<QueueResult<Outcome>> = stream::iter(due)
            .map(|entry| self.process(entry))
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        let mut report = DispatchReport::default();
        for outcome in outcomes {
            match outcome? {
                Outcome::Sent => report.sent += 1,
                Outcome::Retried => report.retried += 1,
                Outcome::Dead => report.dead += 1,
            }
        }
        Ok(report)
    }

    async fn process(&self, entry: OutboxEntry) -> QueueResult<Outcome> {
        let id = entry.id;
        let kind = entry.kind.clone();
        let attempts = entry.attempts;
        let exhausted = entry.attempts_exhausted();

        let result = match self.registry.get(&kind) {
            Some(handler) => match timeout(self.config.job_timeout, handler(entry)).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!("timed out after {:?}", self.config.job_timeout)),
            },
            None => {
                error!("No handler registered for outbox kind: {}", kind);
                self.store
                    .mark_failed(id, &format!("no handler for kind '{}'", kind), None)
                    .await?;
                return Ok(Outcome::Dead);
            }
        };

        match result {
            Ok(()) => {
                self.store.mark_sent(id).await?;
                info!(entry_id = %id, kind = %kind, attempts, "Outbox entry sent");
                Ok(Outcome::Sent)
            }
            Err(message) if exhausted => {
                error!(entry_id = %id, kind = %kind, attempts, error = %message, "Outbox entry is dead");
                self.store.mark_failed(id, &message, None).await?;
                Ok(Outcome::Dead)
            }
            Err(message) => {
                let delay = retry_delay(u32::try_from(attempts).unwrap_or(0));
                let retry_at = Utc::now()
                    + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::seconds(64));
                warn!(entry_id = %id, kind = %kind, attempts, error = %message, ?delay, "Outbox entry failed, retrying");
                self.store.mark_failed(id, &message, Some(retry_at)).await?;
                Ok(Outcome::Retried)
            }
        }
    }

    /// Poll until `shutdown` resolves
    pub async fn run<S>(self, shutdown: S)
    where
        S: Future<Output = ()> + Send,
    {
        info!(
            poll_interval = ?self.config.poll_interval,
            kinds = ?self.registry.kinds(),
            "Outbox dispatcher started"
        );
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Outbox dispatcher stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(report) if report.total() > 0 => {
                            info!(sent = report.sent, retried = report.retried, dead = report.dead, "Outbox batch processed");
                        }
                        Ok(_) => {}
                        Err(e) => error!("Outbox dispatch failed: {}", e),
                    }
                }
            }
        }
    }
}
