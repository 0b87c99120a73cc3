use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

text_enum!(PostStatus {
    Draft => "draft",
    Published => "published",
    Archived => "archived",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: PostStatus,
    pub category: Option<String>,
    pub featured_image: Option<String>,
    pub featured_image_url: Option<String>,
    pub featured_image_public_id: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub view_count: i64,
    pub is_featured: bool,
    pub author_id: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub notification_queued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Publicly visible: published status with a publication time
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published && self.published_at.is_some()
    }

    /// Featured, published and subscribers not yet notified
    pub fn needs_featured_notification(&self) -> bool {
        self.is_featured && self.is_published() && self.notification_queued_at.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub status: PostStatus,
    pub category: Option<String>,
    pub featured_image: Option<String>,
    pub featured_image_url: Option<String>,
    pub featured_image_public_id: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub is_featured: bool,
    pub author_id: i64,
    pub published_at: Option<DateTime<Utc>>,
}

/// Partial update. `None` leaves a column alone; for nullable columns
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub status: Option<PostStatus>,
    pub category: Option<Option<String>>,
    pub featured_image: Option<Option<String>>,
    pub featured_image_url: Option<Option<String>>,
    pub featured_image_public_id: Option<Option<String>>,
    pub meta_title: Option<Option<String>>,
    pub meta_description: Option<Option<String>>,
    pub is_featured: Option<bool>,
    pub published_at: Option<Option<DateTime<Utc>>>,
}

impl PostChanges {
    pub fn apply_to(&self, post: &mut Post) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut post.title, &self.title);
        set(&mut post.slug, &self.slug);
        set(&mut post.content, &self.content);
        set(&mut post.excerpt, &self.excerpt);
        set(&mut post.status, &self.status);
        set(&mut post.category, &self.category);
        set(&mut post.featured_image, &self.featured_image);
        set(&mut post.featured_image_url, &self.featured_image_url);
        set(&mut post.featured_image_public_id, &self.featured_image_public_id);
        set(&mut post.meta_title, &self.meta_title);
        set(&mut post.meta_description, &self.meta_description);
        set(&mut post.is_featured, &self.is_featured);
        set(&mut post.published_at, &self.published_at);
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub offset: i64,
    pub limit: i64,
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        self.status.map_or(true, |s| post.status == s)
            && self
                .category
                .as_ref()
                .map_or(true, |c| post.category.as_ref() == Some(c))
            && self.featured.map_or(true, |f| post.is_featured == f)
    }
}

/// Public author fields attached to post listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuthorSummary {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
}
