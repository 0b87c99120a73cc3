//! PostgreSQL outbox on the `outbox` table
//!
//! `claim_due` uses `FOR UPDATE SKIP LOCKED`, so several dispatchers can
//! share one table without claiming the same entry.

use crate::{
    EntryId, NewOutboxEntry, OutboxEntry, OutboxState, OutboxStats, OutboxStore, QueueError,
    QueueResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PostgresOutbox {
    pool: PgPool,
}

impl PostgresOutbox {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxStore for PostgresOutbox {
    async fn enqueue(&self, entry: NewOutboxEntry) -> QueueResult<bool> {
        let entry = entry.into_entry();
        let result = sqlx::query(
            "INSERT INTO outbox (id, kind, dedupe_key, payload, state, attempts, max_attempts, \
             run_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8) \
             ON CONFLICT (dedupe_key) DO NOTHING",
        )
        .bind(entry.id)
        .bind(&entry.kind)
        .bind(&entry.dedupe_key)
        .bind(&entry.payload)
        .bind(entry.state.as_str())
        .bind(entry.max_attempts)
        .bind(entry.run_at)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        lease: Duration,
    ) -> QueueResult<Vec<OutboxEntry>> {
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| QueueError::Configuration(format!("Invalid lease duration: {}", e)))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let entries = sqlx::query_as::<_, OutboxEntry>(
            "UPDATE outbox SET attempts = attempts + 1, run_at = $3 \
             WHERE id IN ( \
                 SELECT id FROM outbox \
                 WHERE state IN ('pending', 'failed') AND run_at <= $1 \
                 ORDER BY run_at, created_at \
                 LIMIT $2 \
                 FOR UPDATE SKIP LOCKED \
             ) RETURNING *",
        )
        .bind(now)
        .bind(limit)
        .bind(now + lease)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn mark_sent(&self, id: EntryId) -> QueueResult<()> {
        let result = sqlx::query(
            "UPDATE outbox SET state = 'sent', last_error = NULL, processed_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(QueueError::EntryNotFound(id));
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: EntryId,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> QueueResult<()> {
        let (state, processed_at) = match retry_at {
            Some(_) => (OutboxState::Failed, None),
            None => (OutboxState::Dead, Some(Utc::now())),
        };
        let result = sqlx::query(
            "UPDATE outbox SET state = $2, last_error = $3, \
             run_at = COALESCE($4, run_at), processed_at = COALESCE($5, processed_at) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(state.as_str())
        .bind(error)
        .bind(retry_at)
        .bind(processed_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(QueueError::EntryNotFound(id));
        }
        Ok(())
    }

    async fn get(&self, id: EntryId) -> QueueResult<Option<OutboxEntry>> {
        let entry = sqlx::query_as::<_, OutboxEntry>("SELECT * FROM outbox WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn stats(&self) -> QueueResult<OutboxStats> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM outbox GROUP BY state")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = OutboxStats::default();
        for (state, count) in rows {
            let count = u64::try_from(count).unwrap_or(0);
            match OutboxState::try_from(state)? {
                OutboxState::Pending => stats.pending = count,
                OutboxState::Sent => stats.sent = count,
                OutboxState::Failed => stats.failed = count,
                OutboxState::Dead => stats.dead = count,
            }
        }
        Ok(stats)
    }
}
