//! Subscriber e-mails, queued through the outbox and sent by the dispatcher

use inkpost_email::{EmailProvider, EmailTemplates, FeaturedPost};
use inkpost_orm::{Post, Store, Subscriber};
use inkpost_queue::{HandlerRegistry, HandlerResult, NewOutboxEntry, OutboxStore, QueueResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const WELCOME: &str = "welcome";
pub const FEATURED_POST: &str = "featured_post";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelcomePayload {
    pub subscriber_id: i64,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturedPostPayload {
    pub post_id: i64,
    pub subscriber_id: i64,
    pub email: String,
}

pub fn welcome_key(subscriber_id: i64) -> String {
    format!("{}:{}", WELCOME, subscriber_id)
}

pub fn featured_post_key(post_id: i64, subscriber_id: i64) -> String {
    format!("{}:{}:{}", FEATURED_POST, post_id, subscriber_id)
}

/// Queue the welcome e-mail for a new subscriber. Failures are logged only.
pub async fn queue_welcome(outbox: &dyn OutboxStore, max_attempts: i32, subscriber: &Subscriber) {
    match enqueue_welcome(outbox, max_attempts, subscriber).await {
        Ok(true) => debug!(subscriber_id = subscriber.id, "Welcome e-mail queued"),
        Ok(false) => debug!(subscriber_id = subscriber.id, "Welcome e-mail already queued"),
        Err(e) => warn!(subscriber_id = subscriber.id, error = %e, "Failed to queue welcome e-mail"),
    }
}

/// Queue one announcement per active subscriber for a freshly published
/// featured post, then stamp the post so it is announced only once.
/// Returns the number of entries created. Failures are logged only.
pub async fn queue_featured_post(
    store: &dyn Store,
    outbox: &dyn OutboxStore,
    max_attempts: i32,
    post: &Post,
) -> usize {
    if !post.needs_featured_notification() {
        return 0;
    }
    match enqueue_featured(store, outbox, max_attempts, post).await {
        Ok(created) => {
            info!(post_id = post.id, queued = created, "Featured post announcement queued");
            created
        }
        Err(e) => {
            warn!(post_id = post.id, error = %e, "Failed to queue featured post announcement");
            0
        }
    }
}

async fn enqueue_welcome(
    outbox: &dyn OutboxStore,
    max_attempts: i32,
    subscriber: &Subscriber,
) -> QueueResult<bool> {
    let payload = WelcomePayload {
        subscriber_id: subscriber.id,
        email: subscriber.email.clone(),
    };
    let entry = NewOutboxEntry::new(WELCOME, welcome_key(subscriber.id), &payload)?
        .max_attempts(max_attempts);
    outbox.enqueue(entry).await
}

async fn enqueue_featured(
    store: &dyn Store,
    outbox: &dyn OutboxStore,
    max_attempts: i32,
    post: &Post,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let subscribers = store.list_active_subscribers().await?;
    let mut created = 0;
    for subscriber in &subscribers {
        let payload = FeaturedPostPayload {
            post_id: post.id,
            subscriber_id: subscriber.id,
            email: subscriber.email.clone(),
        };
        let entry = NewOutboxEntry::new(
            FEATURED_POST,
            featured_post_key(post.id, subscriber.id),
            &payload,
        )?
        .max_attempts(max_attempts);
        if outbox.enqueue(entry).await? {
            created += 1;
        }
    }
    // Entries are deduplicated, so stamping last keeps a partial failure retryable
    store.mark_post_notification_queued(post.id).await?;
    Ok(created)
}

/// Handlers that deliver queued e-mails through `mailer`
pub fn handlers(
    store: Arc<dyn Store>,
    mailer: Arc<dyn EmailProvider>,
    templates: Arc<EmailTemplates>,
) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    {
        let store = Arc::clone(&store);
        let mailer = Arc::clone(&mailer);
        let templates = Arc::clone(&templates);
        registry.register(WELCOME, move |payload: WelcomePayload| {
            let store = Arc::clone(&store);
            let mailer = Arc::clone(&mailer);
            let templates = Arc::clone(&templates);
            async move { send_welcome(store.as_ref(), mailer.as_ref(), &templates, payload).await }
        });
    }

    registry.register(FEATURED_POST, move |payload: FeaturedPostPayload| {
        let store = Arc::clone(&store);
        let mailer = Arc::clone(&mailer);
        let templates = Arc::clone(&templates);
        async move { send_featured(store.as_ref(), mailer.as_ref(), &templates, payload).await }
    });

    registry
}

async fn still_subscribed(store: &dyn Store, subscriber_id: i64) -> Result<bool, String> {
    let subscriber = store
        .find_subscriber(subscriber_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(subscriber.is_some_and(|s| s.is_active))
}

async fn send_welcome(
    store: &dyn Store,
    mailer: &dyn EmailProvider,
    templates: &EmailTemplates,
    payload: WelcomePayload,
) -> HandlerResult {
    if !still_subscribed(store, payload.subscriber_id).await? {
        debug!(subscriber_id = payload.subscriber_id, "Skipping welcome for inactive subscriber");
        return Ok(());
    }
    let email = templates.welcome(&payload.email)?;
    mailer.send(&email).await?;
    Ok(())
}

async fn send_featured(
    store: &dyn Store,
    mailer: &dyn EmailProvider,
    templates: &EmailTemplates,
    payload: FeaturedPostPayload,
) -> HandlerResult {
    if !still_subscribed(store, payload.subscriber_id).await? {
        debug!(subscriber_id = payload.subscriber_id, "Skipping announcement for inactive subscriber");
        return Ok(());
    }
    let post = store
        .find_post_by_id(payload.post_id)
        .await
        .map_err(|e| e.to_string())?;
    let Some(post) = post.filter(Post::is_published) else {
        debug!(post_id = payload.post_id, "Skipping announcement for unpublished post");
        return Ok(());
    };

    let featured = FeaturedPost {
        title: post.title,
        slug: post.slug,
        excerpt: post.excerpt,
    };
    let email = templates.featured_post(&payload.email, &featured)?;
    mailer.send(&email).await?;
    Ok(())
}
