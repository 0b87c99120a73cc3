//! PostgreSQL backend on a sqlx pool
//!
//! Queries are plain runtime SQL. Enum columns are TEXT and travel through
//! `as_str()` on the way in and `TryFrom<String>` on the way out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{ModelError, ModelResult};
use crate::models::*;
use crate::repository::*;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> ModelResult<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| ModelError::Configuration("DATABASE_URL is not set".to_string()))?;

        let mut options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout());

        if let Some(idle_timeout) = config.idle_timeout_seconds {
            options = options.idle_timeout(Duration::from_secs(idle_timeout));
        }

        let pool = options.connect(url).await.map_err(|e| {
            ModelError::Connection(format!("Failed to create PostgreSQL pool: {}", e))
        })?;

        tracing::info!(
            max_connections = config.max_connections,
            "PostgreSQL pool ready"
        );
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled SQL migrations
    pub async fn run_migrations(&self) -> ModelResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

fn push_post_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a PostFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(featured) = filter.featured {
        qb.push(" AND is_featured = ").push_bind(featured);
    }
}

fn push_comment_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a CommentFilter) {
    if let Some(post_id) = filter.post_id {
        qb.push(" AND post_id = ").push_bind(post_id);
    }
    if let Some(parent_id) = filter.parent_id {
        qb.push(" AND parent_id = ").push_bind(parent_id);
    }
    if !filter.statuses.is_empty() {
        qb.push(" AND status = ANY(")
            .push_bind(filter.status_names())
            .push(")");
    }
}

#[async_trait]
impl PostRepository for PostgresStore {
    async fn create_post(&self, post: NewPost) -> ModelResult<Post> {
        let created = sqlx::query_as::<_, Post>(
            "INSERT INTO posts (title, slug, content, excerpt, status, category, featured_image, \
             featured_image_url, featured_image_public_id, meta_title, meta_description, \
             is_featured, author_id, published_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING *",
        )
        .bind(post.title)
        .bind(post.slug)
        .bind(post.content)
        .bind(post.excerpt)
        .bind(post.status.as_str())
        .bind(post.category)
        .bind(post.featured_image)
        .bind(post.featured_image_url)
        .bind(post.featured_image_public_id)
        .bind(post.meta_title)
        .bind(post.meta_description)
        .bind(post.is_featured)
        .bind(post.author_id)
        .bind(post.published_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_post_by_slug(&self, slug: &str) -> ModelResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn find_post_by_id(&self, id: i64) -> ModelResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn posts_by_ids(&self, ids: &[i64]) -> ModelResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn slug_exists(&self, slug: &str) -> ModelResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE slug = $1)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list_posts(&self, filter: &PostFilter) -> ModelResult<Vec<Post>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM posts WHERE TRUE");
        push_post_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let posts = qb.build_query_as::<Post>().fetch_all(&self.pool).await?;
        Ok(posts)
    }

    async fn count_posts(&self, filter: &PostFilter) -> ModelResult<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts WHERE TRUE");
        push_post_filters(&mut qb, filter);
        let total = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> ModelResult<Option<Post>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE posts SET updated_at = NOW()");
        if let Some(title) = changes.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(slug) = changes.slug {
            qb.push(", slug = ").push_bind(slug);
        }
        if let Some(content) = changes.content {
            qb.push(", content = ").push_bind(content);
        }
        if let Some(excerpt) = changes.excerpt {
            qb.push(", excerpt = ").push_bind(excerpt);
        }
        if let Some(status) = changes.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        if let Some(category) = changes.category {
            qb.push(", category = ").push_bind(category);
        }
        if let Some(featured_image) = changes.featured_image {
            qb.push(", featured_image = ").push_bind(featured_image);
        }
        if let Some(url) = changes.featured_image_url {
            qb.push(", featured_image_url = ").push_bind(url);
        }
        if let Some(public_id) = changes.featured_image_public_id {
            qb.push(", featured_image_public_id = ").push_bind(public_id);
        }
        if let Some(meta_title) = changes.meta_title {
            qb.push(", meta_title = ").push_bind(meta_title);
        }
        if let Some(meta_description) = changes.meta_description {
            qb.push(", meta_description = ").push_bind(meta_description);
        }
        if let Some(is_featured) = changes.is_featured {
            qb.push(", is_featured = ").push_bind(is_featured);
        }
        if let Some(published_at) = changes.published_at {
            qb.push(", published_at = ").push_bind(published_at);
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        let post = qb.build_query_as::<Post>().fetch_optional(&self.pool).await?;
        Ok(post)
    }

    async fn increment_post_views(&self, slug: &str) -> ModelResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            "UPDATE posts SET view_count = view_count + 1 \
             WHERE slug = $1 AND status = 'published' AND published_at IS NOT NULL \
             RETURNING *",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn mark_post_notification_queued(&self, id: i64) -> ModelResult<bool> {
        let result = sqlx::query(
            "UPDATE posts SET notification_queued_at = NOW() \
             WHERE id = $1 AND notification_queued_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_post(&self, id: i64) -> ModelResult<bool> {
        // comments cascade, analytics_events.post_id is set null by the FK
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn comment_counts(&self, post_ids: &[i64]) -> ModelResult<HashMap<i64, i64>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT post_id, COUNT(*) FROM comments \
             WHERE post_id = ANY($1) AND status = 'approved' GROUP BY post_id",
        )
        .bind(post_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresStore {
    async fn create_comment(&self, comment: NewComment) -> ModelResult<Comment> {
        let created = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (post_id, parent_id, author_name, author_email, content, \
             status, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(comment.post_id)
        .bind(comment.parent_id)
        .bind(comment.author_name)
        .bind(comment.author_email)
        .bind(comment.content)
        .bind(comment.status.as_str())
        .bind(comment.ip_address)
        .bind(comment.user_agent)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_comment(&self, id: i64) -> ModelResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn comments_by_ids(&self, ids: &[i64]) -> ModelResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    async fn list_comments(&self, filter: &CommentFilter) -> ModelResult<Vec<Comment>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM comments WHERE TRUE");
        push_comment_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        qb.push(" OFFSET ").push_bind(filter.offset);

        let comments = qb.build_query_as::<Comment>().fetch_all(&self.pool).await?;
        Ok(comments)
    }

    async fn count_comments(&self, filter: &CommentFilter) -> ModelResult<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM comments WHERE TRUE");
        push_comment_filters(&mut qb, filter);
        let total = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn comments_for_posts(
        &self,
        post_ids: &[i64],
        statuses: &[CommentStatus],
    ) -> ModelResult<Vec<Comment>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments \
             WHERE post_id = ANY($1) AND (cardinality($2::text[]) = 0 OR status = ANY($2)) \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(post_ids.to_vec())
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn update_comment(
        &self,
        id: i64,
        changes: CommentChanges,
    ) -> ModelResult<Option<Comment>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE comments SET updated_at = NOW()");
        if let Some(content) = changes.content {
            qb.push(", content = ").push_bind(content);
        }
        if let Some(status) = changes.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        let comment = qb.build_query_as::<Comment>().fetch_optional(&self.pool).await?;
        Ok(comment)
    }

    async fn soft_delete_comment(
        &self,
        id: i64,
        placeholder: &str,
    ) -> ModelResult<Option<Comment>> {
        // SET expressions read the pre-update row, so `content` here is the original
        let comment = sqlx::query_as::<_, Comment>(
            "UPDATE comments SET status = 'deleted', \
             moderated_content = CASE WHEN status = 'deleted' THEN moderated_content ELSE content END, \
             content = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(placeholder)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn hard_delete_comment(&self, id: i64) -> ModelResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ModelError::Transaction(e.to_string()))?;

        let parent: Option<(Option<i64>,)> =
            sqlx::query_as("SELECT parent_id FROM comments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((parent_id,)) = parent else {
            return Ok(false);
        };

        sqlx::query("UPDATE comments SET parent_id = $2, updated_at = NOW() WHERE parent_id = $1")
            .bind(id)
            .bind(parent_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| ModelError::Transaction(e.to_string()))?;
        Ok(true)
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn create_user(&self, user: NewUser) -> ModelResult<User> {
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, username, password_hash, is_admin, full_name) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(normalize_email(&user.email))
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.is_admin)
        .bind(user.full_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_user_by_id(&self, id: i64) -> ModelResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> ModelResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn author_summaries(&self, ids: &[i64]) -> ModelResult<Vec<AuthorSummary>> {
        let authors = sqlx::query_as::<_, AuthorSummary>(
            "SELECT id, username, full_name FROM users WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(authors)
    }
}

#[async_trait]
impl SubscriberRepository for PostgresStore {
    async fn upsert_subscriber(&self, email: &str) -> ModelResult<SubscribeOutcome> {
        // `previous` sees the table as it was before this statement
        let row = sqlx::query(
            "WITH previous AS (SELECT is_active FROM subscribers WHERE email = $1) \
             INSERT INTO subscribers (email, is_active) VALUES ($1, TRUE) \
             ON CONFLICT (email) DO UPDATE SET is_active = TRUE, \
             updated_at = CASE WHEN subscribers.is_active THEN subscribers.updated_at ELSE NOW() END \
             RETURNING id, email, is_active, created_at, updated_at, \
             (SELECT is_active FROM previous) AS was_active",
        )
        .bind(normalize_email(email))
        .fetch_one(&self.pool)
        .await?;

        let subscriber = Subscriber::from_row(&row)?;
        let was_active: Option<bool> = row.try_get("was_active")?;
        Ok(match was_active {
            None => SubscribeOutcome::Created(subscriber),
            Some(false) => SubscribeOutcome::Reactivated(subscriber),
            Some(true) => SubscribeOutcome::AlreadyActive(subscriber),
        })
    }

    async fn find_subscriber(&self, id: i64) -> ModelResult<Option<Subscriber>> {
        let subscriber = sqlx::query_as::<_, Subscriber>("SELECT * FROM subscribers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(subscriber)
    }

    async fn list_active_subscribers(&self) -> ModelResult<Vec<Subscriber>> {
        let subscribers = sqlx::query_as::<_, Subscriber>(
            "SELECT * FROM subscribers WHERE is_active ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(subscribers)
    }

    async fn count_active_subscribers(&self) -> ModelResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscribers WHERE is_active")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn deactivate_subscriber(&self, email: &str) -> ModelResult<Option<Subscriber>> {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            "UPDATE subscribers SET is_active = FALSE, updated_at = NOW() \
             WHERE email = $1 RETURNING *",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(subscriber)
    }

    async fn delete_subscriber(&self, id: i64) -> ModelResult<bool> {
        let result = sqlx::query("DELETE FROM subscribers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AnalyticsRepository for PostgresStore {
    async fn record_event(&self, event: NewAnalyticsEvent) -> ModelResult<AnalyticsEvent> {
        let recorded = sqlx::query_as::<_, AnalyticsEvent>(
            "INSERT INTO analytics_events (event, post_id, metadata, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(event.event)
        .bind(event.post_id)
        .bind(event.metadata)
        .bind(event.ip_address)
        .bind(event.user_agent)
        .fetch_one(&self.pool)
        .await?;
        Ok(recorded)
    }

    async fn events_since(
        &self,
        since: DateTime<Utc>,
        filter: &EventFilter,
    ) -> ModelResult<Vec<AnalyticsEvent>> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT * FROM analytics_events WHERE created_at >= ");
        qb.push_bind(since);
        if let Some(event) = &filter.event {
            qb.push(" AND event = ").push_bind(event.as_str());
        }
        if let Some(post_id) = filter.post_id {
            qb.push(" AND post_id = ").push_bind(post_id);
        }
        qb.push(" ORDER BY created_at ASC, id ASC");

        let events = qb
            .build_query_as::<AnalyticsEvent>()
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn daily_event_counts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ModelResult<Vec<DailyCount>> {
        let counts = sqlx::query_as::<_, DailyCount>(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS count \
             FROM analytics_events WHERE created_at >= $1 AND created_at < $2 \
             GROUP BY 1 ORDER BY 1",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn health_check(&self) -> ModelResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| ModelError::Connection(format!("Database health check failed: {}", e)))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
