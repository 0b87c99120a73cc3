use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    #[default]
    Approved,
    Spam,
    Deleted,
}

text_enum!(CommentStatus {
    Pending => "pending",
    Approved => "approved",
    Spam => "spam",
    Deleted => "deleted",
});

impl CommentStatus {
    /// Statuses anonymous readers may see. Deleted comments stay in the
    /// thread as placeholders so replies keep their context.
    pub const PUBLIC: &'static [CommentStatus] = &[CommentStatus::Approved, CommentStatus::Deleted];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub status: CommentStatus,
    /// Original text kept for audit after a soft delete
    pub moderated_content: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
    pub status: CommentStatus,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentChanges {
    pub content: Option<String>,
    pub status: Option<CommentStatus>,
}

impl CommentChanges {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.status.is_none()
    }
}

/// Listing filter; an empty `statuses` list means every status
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub post_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub statuses: Vec<CommentStatus>,
    pub offset: i64,
    pub limit: Option<i64>,
}

impl CommentFilter {
    pub fn matches(&self, comment: &Comment) -> bool {
        self.post_id.map_or(true, |id| comment.post_id == id)
            && self.parent_id.map_or(true, |id| comment.parent_id == Some(id))
            && (self.statuses.is_empty() || self.statuses.contains(&comment.status))
    }

    pub(crate) fn status_names(&self) -> Vec<String> {
        self.statuses.iter().map(|s| s.as_str().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_text() {
        for status in CommentStatus::ALL {
            assert_eq!(status.as_str().parse::<CommentStatus>().unwrap(), *status);
        }
        assert!("trash".parse::<CommentStatus>().is_err());
    }

    #[test]
    fn test_filter_statuses() {
        let now = Utc::now();
        let comment = Comment {
            id: 3,
            post_id: 1,
            parent_id: Some(2),
            author_name: "Ada".into(),
            author_email: "ada@example.com".into(),
            content: "Nice".into(),
            status: CommentStatus::Spam,
            moderated_content: None,
            ip_address: None,
            user_agent: None,
            created_at: now,
            updated_at: now,
        };

        assert!(CommentFilter::default().matches(&comment));
        let public = CommentFilter {
            statuses: CommentStatus::PUBLIC.to_vec(),
            ..Default::default()
        };
        assert!(!public.matches(&comment));
        let replies = CommentFilter {
            post_id: Some(1),
            parent_id: Some(2),
            ..Default::default()
        };
        assert!(replies.matches(&comment));
    }
}
