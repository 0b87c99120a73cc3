use crate::extractors::{AdminUser, MaybeUser};
use crate::services::analytics_summary::COMMENT;
use crate::services::moderation::{self, DeleteMode, Removal};
use crate::state::AppState;
use crate::views::{CommentListItem, CommentView, ParentSummary, PostSummary};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use inkpost_http::{ClientInfo, HttpError, HttpResult, JsonBody, PageQuery, Paginated, QueryParams};
use inkpost_orm::{CommentChanges, CommentFilter, CommentStatus, NewAnalyticsEvent, NewComment};
use inkpost_validation::{EmailValidator, LengthValidator, RequiredValidator, Rules};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, warn};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_comments).post(create_comment))
        .route("/count", get(count_comments))
        .route("/:id", put(update_comment).delete(delete_comment))
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    post_id: Option<i64>,
    parent_id: Option<i64>,
    status: Option<CommentStatus>,
    page: Option<u32>,
    limit: Option<u32>,
}

/// Statuses `viewer` may see, narrowed by the requested one. `None` when
/// the request asks for something the viewer cannot see.
fn visible_statuses(requested: Option<CommentStatus>, is_admin: bool) -> Option<Vec<CommentStatus>> {
    match (requested, is_admin) {
        (Some(status), true) => Some(vec![status]),
        (None, true) => Some(Vec::new()),
        (Some(status), false) if CommentStatus::PUBLIC.contains(&status) => Some(vec![status]),
        (Some(_), false) => None,
        (None, false) => Some(CommentStatus::PUBLIC.to_vec()),
    }
}

async fn list_comments(
    State(state): State<AppState>,
    viewer: MaybeUser,
    QueryParams(query): QueryParams<ListQuery>,
) -> HttpResult<Json<Paginated<CommentListItem>>> {
    let is_admin = viewer.is_admin();
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve();
    let Some(statuses) = visible_statuses(query.status, is_admin) else {
        return Ok(Json(Paginated::new(Vec::new(), page, 0)));
    };

    let store = state.store.as_ref();
    let filter = CommentFilter {
        post_id: query.post_id,
        parent_id: query.parent_id,
        statuses,
        offset: page.offset(),
        limit: Some(page.limit()),
    };
    let comments = store.list_comments(&filter).await?;
    let total = store.count_comments(&filter).await?;

    let mut post_ids: Vec<i64> = comments.iter().map(|c| c.post_id).collect();
    post_ids.sort_unstable();
    post_ids.dedup();
    let posts: HashMap<i64, PostSummary> = store
        .posts_by_ids(&post_ids)
        .await?
        .iter()
        .map(|post| (post.id, PostSummary::from(post)))
        .collect();

    let mut parent_ids: Vec<i64> = comments.iter().filter_map(|c| c.parent_id).collect();
    parent_ids.sort_unstable();
    parent_ids.dedup();
    let parents: HashMap<i64, ParentSummary> = store
        .comments_by_ids(&parent_ids)
        .await?
        .iter()
        .map(|parent| (parent.id, ParentSummary::from(parent)))
        .collect();

    let items = comments
        .into_iter()
        .map(|comment| CommentListItem {
            post: posts.get(&comment.post_id).cloned(),
            parent: comment.parent_id.and_then(|id| parents.get(&id).cloned()),
            comment: CommentView::for_viewer(comment, is_admin),
        })
        .collect();
    Ok(Json(Paginated::new(items, page, total)))
}

#[derive(Debug, Default, Deserialize)]
struct CountQuery {
    post_id: Option<i64>,
    parent_id: Option<i64>,
    status: Option<CommentStatus>,
}

async fn count_comments(
    State(state): State<AppState>,
    viewer: MaybeUser,
    QueryParams(query): QueryParams<CountQuery>,
) -> HttpResult<Json<serde_json::Value>> {
    let count = match visible_statuses(query.status, viewer.is_admin()) {
        None => 0,
        Some(statuses) => {
            let filter = CommentFilter {
                post_id: query.post_id,
                parent_id: query.parent_id,
                statuses,
                ..Default::default()
            };
            state.store.count_comments(&filter).await?
        }
    };
    Ok(Json(json!({ "count": count })))
}

#[derive(Debug, Serialize, Deserialize)]
struct CreateComment {
    post_id: i64,
    parent_id: Option<i64>,
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    author_email: String,
    #[serde(default)]
    content: String,
}

fn comment_rules() -> Rules {
    Rules::new()
        .field("author_name", RequiredValidator::new())
        .field("author_name", LengthValidator::new().max(100))
        .field("author_email", RequiredValidator::new())
        .field("author_email", EmailValidator::new())
        .field("content", RequiredValidator::new())
        .field("content", LengthValidator::new().max(5000))
}

async fn create_comment(
    State(state): State<AppState>,
    viewer: MaybeUser,
    client: ClientInfo,
    JsonBody(body): JsonBody<CreateComment>,
) -> HttpResult<(StatusCode, Json<CommentView>)> {
    comment_rules().check_serialized(&body).await?;
    let store = state.store.as_ref();

    let post = store
        .find_post_by_id(body.post_id)
        .await?
        .filter(|post| viewer.is_admin() || post.is_published())
        .ok_or_else(|| HttpError::not_found("Post"))?;

    if let Some(parent_id) = body.parent_id {
        let parent = store.find_comment(parent_id).await?;
        if parent.map_or(true, |parent| parent.post_id != post.id) {
            return Err(HttpError::invalid_field(
                "parent_id",
                "parent comment must belong to the same post",
            ));
        }
    }

    let status = if state.config.comments_require_approval {
        CommentStatus::Pending
    } else {
        CommentStatus::Approved
    };
    let comment = store
        .create_comment(NewComment {
            post_id: post.id,
            parent_id: body.parent_id,
            author_name: body.author_name.trim().to_string(),
            author_email: body.author_email.trim().to_string(),
            content: body.content.trim().to_string(),
            status,
            ip_address: client.ip.clone(),
            user_agent: client.user_agent.clone(),
        })
        .await?;
    info!(comment_id = comment.id, post_id = post.id, status = %comment.status, "Comment created");

    let event = NewAnalyticsEvent {
        event: COMMENT.to_string(),
        post_id: Some(post.id),
        metadata: Some(json!({ "comment_id": comment.id, "path": format!("/blog/{}", post.slug) })),
        ip_address: client.ip,
        user_agent: client.user_agent,
    };
    if let Err(e) = store.record_event(event).await {
        warn!(comment_id = comment.id, error = %e, "Failed to record comment analytics event");
    }

    Ok((StatusCode::CREATED, Json(CommentView::public(comment))))
}

#[derive(Debug, Default, Deserialize)]
struct UpdateComment {
    content: Option<String>,
    status: Option<CommentStatus>,
}

async fn update_comment(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<UpdateComment>,
) -> HttpResult<Json<CommentView>> {
    let changes = CommentChanges {
        content: body.content.map(|content| content.trim().to_string()),
        status: body.status,
    };
    if changes.is_empty() {
        return Err(HttpError::bad_request("Nothing to update: provide content or status"));
    }
    if changes.content.as_deref().is_some_and(str::is_empty) {
        return Err(HttpError::invalid_field("content", "content must not be empty"));
    }

    let comment = moderation::edit_comment(state.store.as_ref(), id, changes).await?;
    info!(comment_id = id, admin_id = admin.id, status = %comment.status, "Comment updated");
    Ok(Json(CommentView::moderator(comment)))
}

#[derive(Debug, Default, Deserialize)]
struct DeleteQuery {
    #[serde(default)]
    mode: DeleteMode,
}

async fn delete_comment(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
    QueryParams(query): QueryParams<DeleteQuery>,
) -> HttpResult<Response> {
    match moderation::remove_comment(state.store.as_ref(), id, query.mode).await? {
        Removal::Moderated(comment) => Ok(Json(CommentView::moderator(comment)).into_response()),
        Removal::Deleted => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_statuses() {
        assert_eq!(visible_statuses(None, true), Some(vec![]));
        assert_eq!(
            visible_statuses(Some(CommentStatus::Spam), true),
            Some(vec![CommentStatus::Spam])
        );
        assert_eq!(
            visible_statuses(None, false),
            Some(vec![CommentStatus::Approved, CommentStatus::Deleted])
        );
        assert_eq!(
            visible_statuses(Some(CommentStatus::Deleted), false),
            Some(vec![CommentStatus::Deleted])
        );
        assert_eq!(visible_statuses(Some(CommentStatus::Pending), false), None);
    }
}
