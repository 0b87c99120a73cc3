//! In-memory outbox for development and testing

use crate::{
    EntryId, NewOutboxEntry, OutboxEntry, OutboxState, OutboxStats, OutboxStore, QueueError,
    QueueResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Default)]
struct Inner {
    entries: HashMap<EntryId, OutboxEntry>,
    by_dedupe_key: HashMap<String, EntryId>,
}

#[derive(Default)]
pub struct MemoryOutbox {
    inner: Mutex<Inner>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry, oldest first
    pub fn entries(&self) -> Vec<OutboxEntry> {
        let mut entries: Vec<OutboxEntry> = self.inner.lock().entries.values().cloned().collect();
        entries.sort_by_key(|e| e.created_at);
        entries
    }

    pub fn entries_of_kind(&self, kind: &str) -> Vec<OutboxEntry> {
        self.entries().into_iter().filter(|e| e.kind == kind).collect()
    }

    /// Make every waiting entry due now, skipping backoff in tests
    pub fn release_all(&self) {
        let now = Utc::now();
        for entry in self.inner.lock().entries.values_mut() {
            if matches!(entry.state, OutboxState::Pending | OutboxState::Failed) {
                entry.run_at = now;
            }
        }
    }
}

#[async_trait]
impl OutboxStore for MemoryOutbox {
    async fn enqueue(&self, entry: NewOutboxEntry) -> QueueResult<bool> {
        let mut inner = self.inner.lock();
        if inner.by_dedupe_key.contains_key(&entry.dedupe_key) {
            return Ok(false);
        }
        let entry = entry.into_entry();
        inner.by_dedupe_key.insert(entry.dedupe_key.clone(), entry.id);
        inner.entries.insert(entry.id, entry);
        Ok(true)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        lease: Duration,
    ) -> QueueResult<Vec<OutboxEntry>> {
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| QueueError::Configuration(format!("Invalid lease duration: {}", e)))?;
        let mut inner = self.inner.lock();

        let mut due: Vec<&mut OutboxEntry> =
            inner.entries.values_mut().filter(|e| e.is_due(now)).collect();
        due.sort_by_key(|e| (e.run_at, e.created_at));

        Ok(due
            .into_iter()
            .take(limit)
            .map(|entry| {
                entry.attempts += 1;
                entry.run_at = now + lease;
                entry.clone()
            })
            .collect())
    }

    async fn mark_sent(&self, id: EntryId) -> QueueResult<()> {
        let mut inner = self.inner.lock();
        let entry = inner.entries.get_mut(&id).ok_or(QueueError::EntryNotFound(id))?;
        entry.state = OutboxState::Sent;
        entry.last_error = None;
        entry.processed_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: EntryId,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> QueueResult<()> {
        let mut inner = self.inner.lock();
        let entry = inner.entries.get_mut(&id).ok_or(QueueError::EntryNotFound(id))?;
        entry.last_error = Some(error.to_string());
        match retry_at {
            Some(retry_at) => {
                entry.state = OutboxState::Failed;
                entry.run_at = retry_at;
            }
            None => {
                entry.state = OutboxState::Dead;
                entry.processed_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn get(&self, id: EntryId) -> QueueResult<Option<OutboxEntry>> {
        Ok(self.inner.lock().entries.get(&id).cloned())
    }

    async fn stats(&self) -> QueueResult<OutboxStats> {
        let mut stats = OutboxStats::default();
        for entry in self.inner.lock().entries.values() {
            match entry.state {
                OutboxState::Pending => stats.pending += 1,
                OutboxState::Sent => stats.sent += 1,
                OutboxState::Failed => stats.failed += 1,
                OutboxState::Dead => stats.dead += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn welcome(key: &str) -> NewOutboxEntry {
        NewOutboxEntry::new("welcome", key, &json!({"email": "reader@example.com"})).unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_is_idempotent_on_dedupe_key() {
        let outbox = MemoryOutbox::new();
        assert!(outbox.enqueue(welcome("welcome:1")).await.unwrap());
        assert!(!outbox.enqueue(welcome("welcome:1")).await.unwrap());
        assert!(outbox.enqueue(welcome("welcome:2")).await.unwrap());
        assert_eq!(outbox.stats().await.unwrap().pending, 2);
    }

    #[tokio::test]
    async fn test_claim_leases_entries() {
        let outbox = MemoryOutbox::new();
        outbox.enqueue(welcome("welcome:1")).await.unwrap();

        let now = Utc::now();
        let claimed = outbox.claim_due(now, 10, Duration::from_secs(60)).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].attempts, 1);

        // leased entries are invisible until the lease runs out
        assert!(outbox.claim_due(now, 10, Duration::from_secs(60)).await.unwrap().is_empty());
        let later = now + chrono::Duration::seconds(61);
        assert_eq!(outbox.claim_due(later, 10, Duration::from_secs(60)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delayed_entries_wait() {
        let outbox = MemoryOutbox::new();
        let mut entry = welcome("welcome:1");
        entry.run_at += chrono::Duration::seconds(30);
        outbox.enqueue(entry).await.unwrap();
        assert!(outbox
            .claim_due(Utc::now(), 10, Duration::from_secs(60))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_failed_then_dead() {
        let outbox = MemoryOutbox::new();
        outbox.enqueue(welcome("welcome:1")).await.unwrap();
        let id = outbox.entries()[0].id;

        let retry_at = Utc::now() + chrono::Duration::seconds(2);
        outbox.mark_failed(id, "smtp down", Some(retry_at)).await.unwrap();
        let entry = outbox.get(id).await.unwrap().unwrap();
        assert_eq!(entry.state, OutboxState::Failed);
        assert_eq!(entry.run_at, retry_at);

        outbox.mark_failed(id, "smtp still down", None).await.unwrap();
        let entry = outbox.get(id).await.unwrap().unwrap();
        assert_eq!(entry.state, OutboxState::Dead);
        assert_eq!(entry.last_error.as_deref(), Some("smtp still down"));
        assert!(!entry.is_due(Utc::now() + chrono::Duration::days(1)));
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let outbox = MemoryOutbox::new();
        let id = uuid::Uuid::new_v4();
        assert!(matches!(
            outbox.mark_sent(id).await,
            Err(QueueError::EntryNotFound(missing)) if missing == id
        ));
    }
}
