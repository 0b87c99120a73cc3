//! Response shapes built from stored records

use chrono::{DateTime, Utc};
use inkpost_orm::{AuthorSummary, Comment, CommentStatus, Post};
use serde::{Deserialize, Deserializer, Serialize};

/// Post with its author and approved comment count
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<AuthorSummary>,
    pub comment_count: i64,
}

/// Comment as shown to readers. Contact and client details only appear in
/// the moderator form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub content: String,
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderated_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl CommentView {
    pub fn public(comment: Comment) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            author_name: comment.author_name,
            content: comment.content,
            status: comment.status,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            author_email: None,
            moderated_content: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn moderator(comment: Comment) -> Self {
        Self {
            author_email: Some(comment.author_email.clone()),
            moderated_content: comment.moderated_content.clone(),
            ip_address: comment.ip_address.clone(),
            user_agent: comment.user_agent.clone(),
            ..Self::public(comment)
        }
    }

    pub fn for_viewer(comment: Comment, is_admin: bool) -> Self {
        if is_admin {
            Self::moderator(comment)
        } else {
            Self::public(comment)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

impl From<&Post> for PostSummary {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            slug: post.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentSummary {
    pub id: i64,
    pub author_name: String,
    pub content: String,
}

impl From<&Comment> for ParentSummary {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id,
            author_name: comment.author_name.clone(),
            content: comment.content.clone(),
        }
    }
}

/// Row of `GET /comments`
#[derive(Debug, Clone, Serialize)]
pub struct CommentListItem {
    #[serde(flatten)]
    pub comment: CommentView,
    pub post: Option<PostSummary>,
    pub parent: Option<ParentSummary>,
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in partial updates. Use with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
