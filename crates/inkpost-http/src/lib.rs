//! # inkpost-http
//!
//! Shared HTTP plumbing for the inkpost API: the [`HttpError`] taxonomy and
//! its JSON body, [`HttpConfig`], logging setup, request extractors and the
//! server bootstrap with graceful shutdown.

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod pagination;
pub mod server;

pub use client::ClientInfo;
pub use config::HttpConfig;
pub use error::{HttpError, HttpResult};
pub use extract::{JsonBody, QueryParams};
pub use logging::{init_logging, log_shutdown_info, log_startup_info, LogFormat, LoggingConfig};
pub use pagination::{PageQuery, Paginated, Pagination, PaginationMeta};
pub use server::{apply_middleware, serve, shutdown_signal};
