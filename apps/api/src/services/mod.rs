//! Domain operations used by the route handlers

pub mod accounts;
pub mod analytics_summary;
pub mod comment_tree;
pub mod moderation;
pub mod notifications;
pub mod slug;
pub mod view_counter;
