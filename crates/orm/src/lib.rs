//! # inkpost-orm
//!
//! Storage layer for the blog: record types, repository traits, a
//! PostgreSQL backend built on sqlx and an in-memory backend with the same
//! semantics.

pub mod backends;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;

pub use backends::{MemoryStore, PostgresStore};
pub use config::DatabaseConfig;
pub use error::{ModelError, ModelResult};
pub use models::*;
pub use repository::{
    AnalyticsRepository, CommentRepository, PostRepository, Store, SubscriberRepository,
    UserRepository,
};
