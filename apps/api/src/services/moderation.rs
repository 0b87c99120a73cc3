//! Comment removal by moderators

use inkpost_http::{HttpError, HttpResult};
use inkpost_orm::{Comment, CommentChanges, CommentStatus, Store};
use serde::Deserialize;
use tracing::info;

pub const REMOVED_PLACEHOLDER: &str =
    "[This comment has been removed for violating our community guidelines]";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Keep the row, hide the text
    #[default]
    Soft,
    /// Remove the row, replies move up one level
    Permanent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Removal {
    Moderated(Comment),
    Deleted,
}

pub async fn remove_comment(store: &dyn Store, id: i64, mode: DeleteMode) -> HttpResult<Removal> {
    match mode {
        DeleteMode::Soft => {
            let comment = store
                .soft_delete_comment(id, REMOVED_PLACEHOLDER)
                .await?
                .ok_or_else(|| HttpError::not_found("Comment"))?;
            info!(comment_id = id, post_id = comment.post_id, "Comment moderated");
            Ok(Removal::Moderated(comment))
        }
        DeleteMode::Permanent => {
            if !store.hard_delete_comment(id).await? {
                return Err(HttpError::not_found("Comment"));
            }
            info!(comment_id = id, "Comment permanently deleted");
            Ok(Removal::Deleted)
        }
    }
}

/// Apply a moderator edit. Moving a comment to `deleted` goes through the
/// soft delete so its text is always replaced by the placeholder, and the
/// placeholder of a removed comment cannot be edited.
pub async fn edit_comment(store: &dyn Store, id: i64, changes: CommentChanges) -> HttpResult<Comment> {
    let existing = store
        .find_comment(id)
        .await?
        .ok_or_else(|| HttpError::not_found("Comment"))?;

    if changes.content.is_some()
        && (existing.status == CommentStatus::Deleted
            || changes.status == Some(CommentStatus::Deleted))
    {
        return Err(HttpError::invalid_field(
            "content",
            "content of a removed comment cannot be edited",
        ));
    }

    if changes.status == Some(CommentStatus::Deleted) {
        return match remove_comment(store, id, DeleteMode::Soft).await? {
            Removal::Moderated(comment) => Ok(comment),
            Removal::Deleted => Err(HttpError::not_found("Comment")),
        };
    }

    store
        .update_comment(id, changes)
        .await?
        .ok_or_else(|| HttpError::not_found("Comment"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpost_orm::{
        CommentRepository, CommentStatus, MemoryStore, NewComment, NewPost, PostRepository,
    };

    async fn seed(store: &MemoryStore) -> (i64, i64, i64) {
        let post = store
            .create_post(NewPost {
                title: "Post".into(),
                slug: "post".into(),
                content: "body".into(),
                author_id: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        let new = |parent_id, content: &str| NewComment {
            post_id: post.id,
            parent_id,
            author_name: "Ann".into(),
            author_email: "ann@example.com".into(),
            content: content.into(),
            status: CommentStatus::Approved,
            ip_address: None,
            user_agent: None,
        };
        let root = store.create_comment(new(None, "root")).await.unwrap();
        let middle = store.create_comment(new(Some(root.id), "rude")).await.unwrap();
        let reply = store.create_comment(new(Some(middle.id), "reply")).await.unwrap();
        (root.id, middle.id, reply.id)
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_row_and_replies() {
        let store = MemoryStore::new();
        let (root, middle, reply) = seed(&store).await;

        let removal = remove_comment(&store, middle, DeleteMode::Soft).await.unwrap();
        let Removal::Moderated(comment) = removal else {
            panic!("expected a moderated comment");
        };
        assert_eq!(comment.id, middle);
        assert_eq!(comment.parent_id, Some(root));
        assert_eq!(comment.status, CommentStatus::Deleted);
        assert_eq!(comment.content, REMOVED_PLACEHOLDER);
        assert_eq!(comment.moderated_content.as_deref(), Some("rude"));

        let reply = store.find_comment(reply).await.unwrap().unwrap();
        assert_eq!(reply.parent_id, Some(middle));
    }

    #[tokio::test]
    async fn test_permanent_delete_promotes_replies() {
        let store = MemoryStore::new();
        let (root, middle, reply) = seed(&store).await;

        let removal = remove_comment(&store, middle, DeleteMode::Permanent).await.unwrap();
        assert_eq!(removal, Removal::Deleted);
        assert!(store.find_comment(middle).await.unwrap().is_none());
        let reply = store.find_comment(reply).await.unwrap().unwrap();
        assert_eq!(reply.parent_id, Some(root));
    }

    #[tokio::test]
    async fn test_missing_comment_is_not_found() {
        let store = MemoryStore::new();
        for mode in [DeleteMode::Soft, DeleteMode::Permanent] {
            let err = remove_comment(&store, 404, mode).await.unwrap_err();
            assert!(matches!(err, HttpError::NotFound { .. }));
        }
    }

    #[tokio::test]
    async fn test_status_edit_to_deleted_hides_text() {
        let store = MemoryStore::new();
        let (_, middle, _) = seed(&store).await;

        let changes = CommentChanges {
            content: None,
            status: Some(CommentStatus::Deleted),
        };
        let comment = edit_comment(&store, middle, changes).await.unwrap();
        assert_eq!(comment.status, CommentStatus::Deleted);
        assert_eq!(comment.content, REMOVED_PLACEHOLDER);
        assert_eq!(comment.moderated_content.as_deref(), Some("rude"));
    }

    #[tokio::test]
    async fn test_removed_comment_content_is_frozen() {
        let store = MemoryStore::new();
        let (root, middle, _) = seed(&store).await;
        remove_comment(&store, middle, DeleteMode::Soft).await.unwrap();

        let rewrite = CommentChanges {
            content: Some("sneaky".into()),
            status: None,
        };
        let err = edit_comment(&store, middle, rewrite).await.unwrap_err();
        assert!(matches!(err, HttpError::Validation { .. }));
        let stored = store.find_comment(middle).await.unwrap().unwrap();
        assert_eq!(stored.content, REMOVED_PLACEHOLDER);

        let both = CommentChanges {
            content: Some("new".into()),
            status: Some(CommentStatus::Deleted),
        };
        let err = edit_comment(&store, root, both).await.unwrap_err();
        assert!(matches!(err, HttpError::Validation { .. }));

        let approved = CommentChanges {
            content: Some("edited".into()),
            status: None,
        };
        let comment = edit_comment(&store, root, approved).await.unwrap();
        assert_eq!(comment.content, "edited");
    }

    #[test]
    fn test_mode_parsing() {
        let mode: DeleteMode = serde_json::from_str("\"permanent\"").unwrap();
        assert_eq!(mode, DeleteMode::Permanent);
        assert_eq!(DeleteMode::default(), DeleteMode::Soft);
    }
}
