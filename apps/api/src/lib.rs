//! # inkpost-api
//!
//! The blog backend: axum routes over the storage, auth, e-mail and outbox
//! crates, plus the domain services they share.

pub mod app;
pub mod config;
pub mod extractors;
pub mod routes;
pub mod services;
pub mod state;
pub mod views;

pub use app::build_router;
pub use config::{ApiConfig, SiteConfig};
pub use state::AppState;
