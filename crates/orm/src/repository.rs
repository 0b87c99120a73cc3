//! Repository traits implemented by every storage backend
//!
//! Handlers only see `Arc<dyn Store>`, so the PostgreSQL and in-memory
//! backends are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::ModelResult;
use crate::models::*;

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Fails with `ModelError::Conflict` when the slug is taken
    async fn create_post(&self, post: NewPost) -> ModelResult<Post>;

    async fn find_post_by_slug(&self, slug: &str) -> ModelResult<Option<Post>>;

    async fn find_post_by_id(&self, id: i64) -> ModelResult<Option<Post>>;

    async fn posts_by_ids(&self, ids: &[i64]) -> ModelResult<Vec<Post>>;

    async fn slug_exists(&self, slug: &str) -> ModelResult<bool>;

    /// Newest first, paged by `offset`/`limit`
    async fn list_posts(&self, filter: &PostFilter) -> ModelResult<Vec<Post>>;

    /// Count ignoring paging
    async fn count_posts(&self, filter: &PostFilter) -> ModelResult<i64>;

    async fn update_post(&self, id: i64, changes: PostChanges) -> ModelResult<Option<Post>>;

    /// Atomically bump the view count of a published post and return it.
    /// `None` when no published post has this slug.
    async fn increment_post_views(&self, slug: &str) -> ModelResult<Option<Post>>;

    /// Stamp `notification_queued_at` unless already set; returns whether
    /// this call set it.
    async fn mark_post_notification_queued(&self, id: i64) -> ModelResult<bool>;

    /// Removes the post and its comments, detaches analytics events
    async fn delete_post(&self, id: i64) -> ModelResult<bool>;

    /// Approved comment counts keyed by post id
    async fn comment_counts(&self, post_ids: &[i64]) -> ModelResult<HashMap<i64, i64>>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create_comment(&self, comment: NewComment) -> ModelResult<Comment>;

    async fn find_comment(&self, id: i64) -> ModelResult<Option<Comment>>;

    async fn comments_by_ids(&self, ids: &[i64]) -> ModelResult<Vec<Comment>>;

    /// Newest first
    async fn list_comments(&self, filter: &CommentFilter) -> ModelResult<Vec<Comment>>;

    async fn count_comments(&self, filter: &CommentFilter) -> ModelResult<i64>;

    /// Every comment of the given posts with one of `statuses`, oldest first
    async fn comments_for_posts(
        &self,
        post_ids: &[i64],
        statuses: &[CommentStatus],
    ) -> ModelResult<Vec<Comment>>;

    async fn update_comment(&self, id: i64, changes: CommentChanges)
        -> ModelResult<Option<Comment>>;

    /// Mark deleted and swap the content for `placeholder` in one update.
    /// The first original text is kept in `moderated_content`.
    async fn soft_delete_comment(&self, id: i64, placeholder: &str)
        -> ModelResult<Option<Comment>>;

    /// Remove the row after moving its direct replies up to its own parent,
    /// all in one transaction. Returns false for an unknown id.
    async fn hard_delete_comment(&self, id: i64) -> ModelResult<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `ModelError::Conflict` on a duplicate email or username
    async fn create_user(&self, user: NewUser) -> ModelResult<User>;

    async fn find_user_by_id(&self, id: i64) -> ModelResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> ModelResult<Option<User>>;

    async fn author_summaries(&self, ids: &[i64]) -> ModelResult<Vec<AuthorSummary>>;
}

#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Insert or reactivate an address in one statement
    async fn upsert_subscriber(&self, email: &str) -> ModelResult<SubscribeOutcome>;

    async fn find_subscriber(&self, id: i64) -> ModelResult<Option<Subscriber>>;

    /// Oldest first
    async fn list_active_subscribers(&self) -> ModelResult<Vec<Subscriber>>;

    async fn count_active_subscribers(&self) -> ModelResult<i64>;

    async fn deactivate_subscriber(&self, email: &str) -> ModelResult<Option<Subscriber>>;

    async fn delete_subscriber(&self, id: i64) -> ModelResult<bool>;
}

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn record_event(&self, event: NewAnalyticsEvent) -> ModelResult<AnalyticsEvent>;

    /// Events at or after `since`, oldest first
    async fn events_since(
        &self,
        since: DateTime<Utc>,
        filter: &EventFilter,
    ) -> ModelResult<Vec<AnalyticsEvent>>;

    /// Per-day counts in `[from, to)`; days without events are omitted
    async fn daily_event_counts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ModelResult<Vec<DailyCount>>;
}

/// Everything the application needs from storage
#[async_trait]
pub trait Store:
    PostRepository + CommentRepository + UserRepository + SubscriberRepository + AnalyticsRepository
{
    async fn health_check(&self) -> ModelResult<()>;

    fn backend_name(&self) -> &'static str;
}
