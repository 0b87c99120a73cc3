//! # inkpost-auth
//!
//! Credential handling for the admin API: password hashers, the
//! server-side session store and the session cookie settings.

pub mod config;
pub mod error;
pub mod hasher;
pub mod session;

pub use config::{AuthConfig, CookieSameSite, SessionConfig};
pub use error::{AuthError, AuthResult};
pub use hasher::{verify_any, Argon2Hasher, BcryptHasher, HashAlgorithm, PasswordHasher};
pub use session::{MemorySessionStore, Session, SessionId, SessionStore};
