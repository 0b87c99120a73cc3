//! In-memory backend
//!
//! Every mutation takes the write lock once, which gives the same
//! all-or-nothing behavior the PostgreSQL backend gets from single
//! statements and transactions. Used by tests and `inkpost --memory`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::error::{ModelError, ModelResult};
use crate::models::*;
use crate::repository::*;

#[derive(Default)]
struct Tables {
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    users: BTreeMap<i64, User>,
    subscribers: BTreeMap<i64, Subscriber>,
    events: Vec<AnalyticsEvent>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn page<T>(items: Vec<T>, offset: i64, limit: Option<i64>) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let iter = items.into_iter().skip(offset);
    match limit {
        Some(limit) => iter.take(usize::try_from(limit).unwrap_or(0)).collect(),
        None => iter.collect(),
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create_post(&self, post: NewPost) -> ModelResult<Post> {
        let mut tables = self.tables.write();
        if tables.posts.values().any(|p| p.slug == post.slug) {
            return Err(ModelError::Conflict(format!("slug '{}' already exists", post.slug)));
        }

        let now = Utc::now();
        let id = tables.next_id();
        let created = Post {
            id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            excerpt: post.excerpt,
            status: post.status,
            category: post.category,
            featured_image: post.featured_image,
            featured_image_url: post.featured_image_url,
            featured_image_public_id: post.featured_image_public_id,
            meta_title: post.meta_title,
            meta_description: post.meta_description,
            view_count: 0,
            is_featured: post.is_featured,
            author_id: post.author_id,
            published_at: post.published_at,
            notification_queued_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(id, created.clone());
        Ok(created)
    }

    async fn find_post_by_slug(&self, slug: &str) -> ModelResult<Option<Post>> {
        Ok(self.tables.read().posts.values().find(|p| p.slug == slug).cloned())
    }

    async fn find_post_by_id(&self, id: i64) -> ModelResult<Option<Post>> {
        Ok(self.tables.read().posts.get(&id).cloned())
    }

    async fn posts_by_ids(&self, ids: &[i64]) -> ModelResult<Vec<Post>> {
        let tables = self.tables.read();
        Ok(ids.iter().filter_map(|id| tables.posts.get(id).cloned()).collect())
    }

    async fn slug_exists(&self, slug: &str) -> ModelResult<bool> {
        Ok(self.tables.read().posts.values().any(|p| p.slug == slug))
    }

    async fn list_posts(&self, filter: &PostFilter) -> ModelResult<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .tables
            .read()
            .posts
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        newest_first(&mut posts, |p| (p.created_at, p.id));
        Ok(page(posts, filter.offset, Some(filter.limit)))
    }

    async fn count_posts(&self, filter: &PostFilter) -> ModelResult<i64> {
        let count = self.tables.read().posts.values().filter(|p| filter.matches(p)).count();
        Ok(count as i64)
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> ModelResult<Option<Post>> {
        let mut tables = self.tables.write();
        if let Some(slug) = &changes.slug {
            if tables.posts.values().any(|p| &p.slug == slug && p.id != id) {
                return Err(ModelError::Conflict(format!("slug '{}' already exists", slug)));
            }
        }

        let Some(post) = tables.posts.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply_to(post);
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn increment_post_views(&self, slug: &str) -> ModelResult<Option<Post>> {
        let mut tables = self.tables.write();
        let post = tables
            .posts
            .values_mut()
            .find(|p| p.slug == slug && p.is_published());
        Ok(post.map(|post| {
            post.view_count += 1;
            post.clone()
        }))
    }

    async fn mark_post_notification_queued(&self, id: i64) -> ModelResult<bool> {
        let mut tables = self.tables.write();
        match tables.posts.get_mut(&id) {
            Some(post) if post.notification_queued_at.is_none() => {
                post.notification_queued_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_post(&self, id: i64) -> ModelResult<bool> {
        let mut tables = self.tables.write();
        if tables.posts.remove(&id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, c| c.post_id != id);
        for event in tables.events.iter_mut().filter(|e| e.post_id == Some(id)) {
            event.post_id = None;
        }
        Ok(true)
    }

    async fn comment_counts(&self, post_ids: &[i64]) -> ModelResult<HashMap<i64, i64>> {
        let tables = self.tables.read();
        let mut counts = HashMap::new();
        for comment in tables.comments.values() {
            if comment.status == CommentStatus::Approved && post_ids.contains(&comment.post_id) {
                *counts.entry(comment.post_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create_comment(&self, comment: NewComment) -> ModelResult<Comment> {
        let mut tables = self.tables.write();
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(ModelError::Validation(format!(
                "post {} does not exist",
                comment.post_id
            )));
        }

        let now = Utc::now();
        let id = tables.next_id();
        let created = Comment {
            id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            author_name: comment.author_name,
            author_email: comment.author_email,
            content: comment.content,
            status: comment.status,
            moderated_content: None,
            ip_address: comment.ip_address,
            user_agent: comment.user_agent,
            created_at: now,
            updated_at: now,
        };
        tables.comments.insert(id, created.clone());
        Ok(created)
    }

    async fn find_comment(&self, id: i64) -> ModelResult<Option<Comment>> {
        Ok(self.tables.read().comments.get(&id).cloned())
    }

    async fn comments_by_ids(&self, ids: &[i64]) -> ModelResult<Vec<Comment>> {
        let tables = self.tables.read();
        Ok(ids.iter().filter_map(|id| tables.comments.get(id).cloned()).collect())
    }

    async fn list_comments(&self, filter: &CommentFilter) -> ModelResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .tables
            .read()
            .comments
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        newest_first(&mut comments, |c| (c.created_at, c.id));
        Ok(page(comments, filter.offset, filter.limit))
    }

    async fn count_comments(&self, filter: &CommentFilter) -> ModelResult<i64> {
        let count = self.tables.read().comments.values().filter(|c| filter.matches(c)).count();
        Ok(count as i64)
    }

    async fn comments_for_posts(
        &self,
        post_ids: &[i64],
        statuses: &[CommentStatus],
    ) -> ModelResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .tables
            .read()
            .comments
            .values()
            .filter(|c| post_ids.contains(&c.post_id))
            .filter(|c| statuses.is_empty() || statuses.contains(&c.status))
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn update_comment(
        &self,
        id: i64,
        changes: CommentChanges,
    ) -> ModelResult<Option<Comment>> {
        let mut tables = self.tables.write();
        let Some(comment) = tables.comments.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(content) = changes.content {
            comment.content = content;
        }
        if let Some(status) = changes.status {
            comment.status = status;
        }
        comment.updated_at = Utc::now();
        Ok(Some(comment.clone()))
    }

    async fn soft_delete_comment(
        &self,
        id: i64,
        placeholder: &str,
    ) -> ModelResult<Option<Comment>> {
        let mut tables = self.tables.write();
        let Some(comment) = tables.comments.get_mut(&id) else {
            return Ok(None);
        };
        if comment.status != CommentStatus::Deleted {
            comment.moderated_content = Some(std::mem::take(&mut comment.content));
        }
        comment.content = placeholder.to_string();
        comment.status = CommentStatus::Deleted;
        comment.updated_at = Utc::now();
        Ok(Some(comment.clone()))
    }

    async fn hard_delete_comment(&self, id: i64) -> ModelResult<bool> {
        let mut tables = self.tables.write();
        let Some(removed) = tables.comments.remove(&id) else {
            return Ok(false);
        };
        let now = Utc::now();
        for reply in tables.comments.values_mut().filter(|c| c.parent_id == Some(id)) {
            reply.parent_id = removed.parent_id;
            reply.updated_at = now;
        }
        Ok(true)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> ModelResult<User> {
        let mut tables = self.tables.write();
        let email = normalize_email(&user.email);
        if tables.users.values().any(|u| u.email == email) {
            return Err(ModelError::Conflict("unique constraint 'users_email_key' violated".into()));
        }
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(ModelError::Conflict(
                "unique constraint 'users_username_key' violated".into(),
            ));
        }

        let now = Utc::now();
        let id = tables.next_id();
        let created = User {
            id,
            email,
            username: user.username,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
            full_name: user.full_name,
            bio: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user_by_id(&self, id: i64) -> ModelResult<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> ModelResult<Option<User>> {
        let email = normalize_email(email);
        Ok(self.tables.read().users.values().find(|u| u.email == email).cloned())
    }

    async fn author_summaries(&self, ids: &[i64]) -> ModelResult<Vec<AuthorSummary>> {
        let tables = self.tables.read();
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id))
            .map(|u| AuthorSummary {
                id: u.id,
                username: u.username.clone(),
                full_name: u.full_name.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl SubscriberRepository for MemoryStore {
    async fn upsert_subscriber(&self, email: &str) -> ModelResult<SubscribeOutcome> {
        let mut tables = self.tables.write();
        let email = normalize_email(email);
        let now = Utc::now();

        if let Some(existing) = tables.subscribers.values_mut().find(|s| s.email == email) {
            if existing.is_active {
                return Ok(SubscribeOutcome::AlreadyActive(existing.clone()));
            }
            existing.is_active = true;
            existing.updated_at = now;
            return Ok(SubscribeOutcome::Reactivated(existing.clone()));
        }

        let id = tables.next_id();
        let subscriber = Subscriber {
            id,
            email,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.subscribers.insert(id, subscriber.clone());
        Ok(SubscribeOutcome::Created(subscriber))
    }

    async fn find_subscriber(&self, id: i64) -> ModelResult<Option<Subscriber>> {
        Ok(self.tables.read().subscribers.get(&id).cloned())
    }

    async fn list_active_subscribers(&self) -> ModelResult<Vec<Subscriber>> {
        let mut active: Vec<Subscriber> = self
            .tables
            .read()
            .subscribers
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        active.sort_by_key(|s| (s.created_at, s.id));
        Ok(active)
    }

    async fn count_active_subscribers(&self) -> ModelResult<i64> {
        let count = self.tables.read().subscribers.values().filter(|s| s.is_active).count();
        Ok(count as i64)
    }

    async fn deactivate_subscriber(&self, email: &str) -> ModelResult<Option<Subscriber>> {
        let mut tables = self.tables.write();
        let email = normalize_email(email);
        let Some(subscriber) = tables.subscribers.values_mut().find(|s| s.email == email) else {
            return Ok(None);
        };
        subscriber.is_active = false;
        subscriber.updated_at = Utc::now();
        Ok(Some(subscriber.clone()))
    }

    async fn delete_subscriber(&self, id: i64) -> ModelResult<bool> {
        Ok(self.tables.write().subscribers.remove(&id).is_some())
    }
}

#[async_trait]
impl AnalyticsRepository for MemoryStore {
    async fn record_event(&self, event: NewAnalyticsEvent) -> ModelResult<AnalyticsEvent> {
        let mut tables = self.tables.write();
        let post_id = event.post_id.filter(|id| tables.posts.contains_key(id));
        let id = tables.next_id();
        let recorded = AnalyticsEvent {
            id,
            event: event.event,
            post_id,
            metadata: event.metadata,
            ip_address: event.ip_address,
            user_agent: event.user_agent,
            created_at: Utc::now(),
        };
        tables.events.push(recorded.clone());
        Ok(recorded)
    }

    async fn events_since(
        &self,
        since: DateTime<Utc>,
        filter: &EventFilter,
    ) -> ModelResult<Vec<AnalyticsEvent>> {
        Ok(self
            .tables
            .read()
            .events
            .iter()
            .filter(|e| e.created_at >= since && filter.matches(e))
            .cloned()
            .collect())
    }

    async fn daily_event_counts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ModelResult<Vec<DailyCount>> {
        let mut counts = BTreeMap::new();
        for event in self.tables.read().events.iter() {
            if event.created_at >= from && event.created_at < to {
                *counts.entry(event.created_at.date_naive()).or_insert(0) += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(day, count)| DailyCount { day, count })
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> ModelResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn seed_post(store: &MemoryStore, slug: &str, status: PostStatus) -> Post {
        store
            .create_post(NewPost {
                title: slug.to_string(),
                slug: slug.to_string(),
                content: "Body".into(),
                status,
                author_id: 1,
                published_at: (status == PostStatus::Published).then(Utc::now),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    async fn seed_comment(store: &MemoryStore, post_id: i64, parent_id: Option<i64>) -> Comment {
        store
            .create_comment(NewComment {
                post_id,
                parent_id,
                author_name: "Reader".into(),
                author_email: "reader@example.com".into(),
                content: "Original words".into(),
                status: CommentStatus::Approved,
                ip_address: None,
                user_agent: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_slug_conflicts() {
        let store = MemoryStore::new();
        seed_post(&store, "hello", PostStatus::Draft).await;
        let err = store
            .create_post(NewPost {
                slug: "hello".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_increment_only_counts_published_posts() {
        let store = MemoryStore::new();
        seed_post(&store, "draft", PostStatus::Draft).await;
        seed_post(&store, "live", PostStatus::Published).await;

        assert!(store.increment_post_views("draft").await.unwrap().is_none());
        assert!(store.increment_post_views("missing").await.unwrap().is_none());
        let post = store.increment_post_views("live").await.unwrap().unwrap();
        assert_eq!(post.view_count, 1);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        seed_post(&store, "busy", PostStatus::Published).await;

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.increment_post_views("busy").await })
            })
            .collect();
        for task in futures::future::join_all(tasks).await {
            task.unwrap().unwrap();
        }

        let post = store.find_post_by_slug("busy").await.unwrap().unwrap();
        assert_eq!(post.view_count, 50);
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_original_once() {
        let store = MemoryStore::new();
        let post = seed_post(&store, "p", PostStatus::Published).await;
        let comment = seed_comment(&store, post.id, None).await;

        let first = store.soft_delete_comment(comment.id, "[removed]").await.unwrap().unwrap();
        assert_eq!(first.status, CommentStatus::Deleted);
        assert_eq!(first.content, "[removed]");
        assert_eq!(first.moderated_content.as_deref(), Some("Original words"));

        let second = store.soft_delete_comment(comment.id, "[removed]").await.unwrap().unwrap();
        assert_eq!(second.moderated_content.as_deref(), Some("Original words"));
        assert!(store.soft_delete_comment(999, "[removed]").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hard_delete_promotes_direct_replies() {
        let store = MemoryStore::new();
        let post = seed_post(&store, "p", PostStatus::Published).await;
        let root = seed_comment(&store, post.id, None).await;
        let middle = seed_comment(&store, post.id, Some(root.id)).await;
        let leaf = seed_comment(&store, post.id, Some(middle.id)).await;

        assert!(store.hard_delete_comment(middle.id).await.unwrap());
        assert!(store.find_comment(middle.id).await.unwrap().is_none());
        let leaf = store.find_comment(leaf.id).await.unwrap().unwrap();
        assert_eq!(leaf.parent_id, Some(root.id));

        assert!(store.hard_delete_comment(root.id).await.unwrap());
        let leaf = store.find_comment(leaf.id).await.unwrap().unwrap();
        assert_eq!(leaf.parent_id, None);
        assert!(!store.hard_delete_comment(root.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_post_cascades() {
        let store = MemoryStore::new();
        let post = seed_post(&store, "p", PostStatus::Published).await;
        seed_comment(&store, post.id, None).await;
        store
            .record_event(NewAnalyticsEvent {
                event: "page_view".into(),
                post_id: Some(post.id),
                metadata: None,
                ip_address: None,
                user_agent: None,
            })
            .await
            .unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        let filter = CommentFilter::default();
        assert_eq!(store.count_comments(&filter).await.unwrap(), 0);
        let events = store
            .events_since(Utc::now() - chrono::Duration::hours(1), &EventFilter::default())
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].post_id, None);
    }

    #[tokio::test]
    async fn test_subscriber_upsert_outcomes() {
        let store = MemoryStore::new();
        let created = store.upsert_subscriber("Reader@Example.com").await.unwrap();
        assert!(created.is_created());
        assert_eq!(created.subscriber().email, "reader@example.com");

        let again = store.upsert_subscriber("reader@example.com").await.unwrap();
        assert!(matches!(again, SubscribeOutcome::AlreadyActive(_)));

        store.deactivate_subscriber("READER@example.com").await.unwrap().unwrap();
        assert_eq!(store.count_active_subscribers().await.unwrap(), 0);

        let back = store.upsert_subscriber("reader@example.com").await.unwrap();
        assert!(matches!(back, SubscribeOutcome::Reactivated(_)));
        assert_eq!(back.subscriber().id, created.subscriber().id);
    }

    #[tokio::test]
    async fn test_notification_stamp_is_claimed_once() {
        let store = MemoryStore::new();
        let post = seed_post(&store, "p", PostStatus::Published).await;
        assert!(store.mark_post_notification_queued(post.id).await.unwrap());
        assert!(!store.mark_post_notification_queued(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_posts_pages_newest_first() {
        let store = MemoryStore::new();
        for slug in ["a", "b", "c"] {
            seed_post(&store, slug, PostStatus::Published).await;
        }
        let filter = PostFilter {
            offset: 1,
            limit: 1,
            ..Default::default()
        };
        let posts = store.list_posts(&filter).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "b");
        assert_eq!(store.count_posts(&filter).await.unwrap(), 3);
    }
}
