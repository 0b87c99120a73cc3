use crate::extractors::{AdminUser, MaybeUser};
use crate::services::comment_tree::{build_threads, Thread};
use crate::services::{notifications, slug, view_counter};
use crate::state::AppState;
use crate::views::{double_option, CommentView, PostView};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use inkpost_http::{HttpError, HttpResult, JsonBody, PageQuery, Paginated, QueryParams};
use inkpost_orm::{
    CommentStatus, ModelError, NewPost, Post, PostChanges, PostFilter, PostStatus, Store,
};
use inkpost_validation::{LengthValidator, RequiredValidator, Rules};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/:slug", get(get_post).put(update_post).delete(delete_post))
        .route("/:slug/comments", get(post_comments))
}

/// Attach authors and approved comment counts
async fn post_views(store: &dyn Store, posts: Vec<Post>) -> HttpResult<Vec<PostView>> {
    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let mut author_ids: Vec<i64> = posts.iter().map(|p| p.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: HashMap<_, _> = store
        .author_summaries(&author_ids)
        .await?
        .into_iter()
        .map(|author| (author.id, author))
        .collect();
    let counts = store.comment_counts(&ids).await?;

    Ok(posts
        .into_iter()
        .map(|post| PostView {
            author: authors.get(&post.author_id).cloned(),
            comment_count: counts.get(&post.id).copied().unwrap_or(0),
            post,
        })
        .collect())
}

async fn post_view(store: &dyn Store, post: Post) -> HttpResult<PostView> {
    post_views(store, vec![post])
        .await?
        .pop()
        .ok_or_else(|| HttpError::internal("Post view lost"))
}

/// Admin routes address posts by slug or by numeric id
async fn find_post(store: &dyn Store, key: &str) -> HttpResult<Post> {
    if let Some(post) = store.find_post_by_slug(key).await? {
        return Ok(post);
    }
    if let Ok(id) = key.parse::<i64>() {
        if let Some(post) = store.find_post_by_id(id).await? {
            return Ok(post);
        }
    }
    Err(HttpError::not_found("Post"))
}

fn slug_conflict(slug: &str) -> impl FnOnce(ModelError) -> HttpError + '_ {
    move |err| match err {
        ModelError::Conflict(_) => {
            HttpError::conflict(format!("A post with slug '{}' already exists", slug))
        }
        other => other.into(),
    }
}

fn post_rules(creating: bool) -> Rules {
    let mut rules = Rules::new();
    if creating {
        rules = rules
            .field("title", RequiredValidator::new())
            .field("content", RequiredValidator::new());
    }
    rules
        .field("title", LengthValidator::new().range(1, 200))
        .field("content", LengthValidator::new().min(1))
        .field("slug", LengthValidator::new().max(200))
        .field("excerpt", LengthValidator::new().max(500))
        .field("category", LengthValidator::new().max(100))
        .field("meta_title", LengthValidator::new().max(200))
        .field("meta_description", LengthValidator::new().max(300))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<PostStatus>,
    category: Option<String>,
    featured: Option<bool>,
    page: Option<u32>,
    limit: Option<u32>,
}

async fn list_posts(
    State(state): State<AppState>,
    viewer: MaybeUser,
    QueryParams(query): QueryParams<ListQuery>,
) -> HttpResult<Json<Paginated<PostView>>> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve();
    let status = if viewer.is_admin() {
        query.status
    } else {
        Some(PostStatus::Published)
    };
    let filter = PostFilter {
        status,
        category: query.category,
        featured: query.featured,
        offset: page.offset(),
        limit: page.limit(),
    };

    let store = state.store.as_ref();
    let posts = store.list_posts(&filter).await?;
    let total = store.count_posts(&filter).await?;
    let views = post_views(store, posts).await?;
    Ok(Json(Paginated::new(views, page, total)))
}

#[derive(Debug, Serialize, Deserialize)]
struct CreatePost {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    slug: Option<String>,
    excerpt: Option<String>,
    status: Option<PostStatus>,
    category: Option<String>,
    featured_image: Option<String>,
    featured_image_url: Option<String>,
    featured_image_public_id: Option<String>,
    meta_title: Option<String>,
    meta_description: Option<String>,
    #[serde(default)]
    is_featured: bool,
    published_at: Option<DateTime<Utc>>,
}

async fn create_post(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    JsonBody(body): JsonBody<CreatePost>,
) -> HttpResult<(StatusCode, Json<PostView>)> {
    post_rules(true).check_serialized(&body).await?;
    let store = state.store.as_ref();

    let title = body.title.trim().to_string();
    let slug = match body.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(explicit) => slug::normalize_explicit(explicit)?,
        None => slug::generate_unique(store, &title).await?,
    };
    let status = body.status.unwrap_or_default();
    let published_at = match status {
        PostStatus::Published => Some(body.published_at.unwrap_or_else(Utc::now)),
        _ => body.published_at,
    };

    let post = store
        .create_post(NewPost {
            title,
            slug: slug.clone(),
            content: body.content,
            excerpt: body.excerpt,
            status,
            category: body.category,
            featured_image: body.featured_image,
            featured_image_url: body.featured_image_url,
            featured_image_public_id: body.featured_image_public_id,
            meta_title: body.meta_title,
            meta_description: body.meta_description,
            is_featured: body.is_featured,
            author_id: admin.id,
            published_at,
        })
        .await
        .map_err(slug_conflict(&slug))?;
    info!(post_id = post.id, slug = %post.slug, status = %post.status, "Post created");

    let post = announce_if_featured(&state, post).await?;
    Ok((StatusCode::CREATED, Json(post_view(store, post).await?)))
}

/// Queue subscriber e-mails for a newly published featured post and return
/// the post as stored afterwards
async fn announce_if_featured(state: &AppState, post: Post) -> HttpResult<Post> {
    if !post.needs_featured_notification() {
        return Ok(post);
    }
    notifications::queue_featured_post(
        state.store.as_ref(),
        state.outbox.as_ref(),
        state.config.queue.max_attempts,
        &post,
    )
    .await;
    Ok(state.store.find_post_by_id(post.id).await?.unwrap_or(post))
}

async fn get_post(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> HttpResult<Json<PostView>> {
    let store = state.store.as_ref();
    let post = view_counter::read_post(store, &slug, viewer.is_admin()).await?;
    Ok(Json(post_view(store, post).await?))
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UpdatePost {
    title: Option<String>,
    slug: Option<String>,
    content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    excerpt: Option<Option<String>>,
    status: Option<PostStatus>,
    #[serde(default, deserialize_with = "double_option")]
    category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    featured_image: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    featured_image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    featured_image_public_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    meta_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    meta_description: Option<Option<String>>,
    is_featured: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    published_at: Option<Option<DateTime<Utc>>>,
}

async fn update_post(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(key): Path<String>,
    JsonBody(body): JsonBody<UpdatePost>,
) -> HttpResult<Json<PostView>> {
    post_rules(false).check_serialized(&body).await?;
    let store = state.store.as_ref();
    let existing = find_post(store, &key).await?;

    let slug = body.slug.as_deref().map(slug::normalize_explicit).transpose()?;
    let mut changes = PostChanges {
        title: body.title.map(|title| title.trim().to_string()),
        slug: slug.clone(),
        content: body.content,
        excerpt: body.excerpt,
        status: body.status,
        category: body.category,
        featured_image: body.featured_image,
        featured_image_url: body.featured_image_url,
        featured_image_public_id: body.featured_image_public_id,
        meta_title: body.meta_title,
        meta_description: body.meta_description,
        is_featured: body.is_featured,
        published_at: body.published_at,
    };

    // Publishing stamps the publication time unless one is given or kept
    let status = changes.status.unwrap_or(existing.status);
    let published_at = changes.published_at.unwrap_or(existing.published_at);
    if status == PostStatus::Published && published_at.is_none() {
        changes.published_at = Some(Some(Utc::now()));
    }

    let post = store
        .update_post(existing.id, changes)
        .await
        .map_err(slug_conflict(slug.as_deref().unwrap_or_default()))?
        .ok_or_else(|| HttpError::not_found("Post"))?;
    info!(post_id = post.id, admin_id = admin.id, "Post updated");

    let post = announce_if_featured(&state, post).await?;
    Ok(Json(post_view(store, post).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(key): Path<String>,
) -> HttpResult<StatusCode> {
    let store = state.store.as_ref();
    let post = find_post(store, &key).await?;
    if !store.delete_post(post.id).await? {
        return Err(HttpError::not_found("Post"));
    }
    info!(post_id = post.id, slug = %post.slug, admin_id = admin.id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct PostComments {
    post_id: i64,
    total: usize,
    comments: Vec<Thread<CommentView>>,
}

async fn post_comments(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> HttpResult<Json<PostComments>> {
    let is_admin = viewer.is_admin();
    let store = state.store.as_ref();
    let post = store
        .find_post_by_slug(&slug)
        .await?
        .filter(|post| is_admin || post.is_published())
        .ok_or_else(|| HttpError::not_found("Post"))?;

    let statuses: &[CommentStatus] = if is_admin { &[] } else { CommentStatus::PUBLIC };
    let comments = store.comments_for_posts(&[post.id], statuses).await?;
    let total = comments.len();
    let threads = build_threads(comments, |c| CommentView::for_viewer(c, is_admin));

    Ok(Json(PostComments {
        post_id: post.id,
        total,
        comments: threads,
    }))
}
