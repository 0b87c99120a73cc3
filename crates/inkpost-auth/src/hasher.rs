//! Password hashing

use crate::{AuthError, AuthResult};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use rand::thread_rng;
use std::str::FromStr;
use std::sync::Arc;

pub trait PasswordHasher: Send + Sync {
    fn hash_password(&self, password: &str) -> AuthResult<String>;

    /// Verify a password against its hash
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<bool>;

    fn hasher_name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Argon2,
    Bcrypt,
}

impl FromStr for HashAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "argon2" | "argon2id" => Ok(Self::Argon2),
            "bcrypt" => Ok(Self::Bcrypt),
            other => Err(AuthError::config_error(format!(
                "Unknown password hashing algorithm: {}",
                other
            ))),
        }
    }
}

impl HashAlgorithm {
    /// Production-strength hasher for this algorithm
    pub fn hasher(self) -> Arc<dyn PasswordHasher> {
        match self {
            Self::Argon2 => Arc::new(Argon2Hasher::default()),
            Self::Bcrypt => Arc::new(BcryptHasher::default()),
        }
    }

    /// Cheap parameters for tests and local development
    pub fn development_hasher(self) -> Arc<dyn PasswordHasher> {
        match self {
            Self::Argon2 => Arc::new(Argon2Hasher::development()),
            Self::Bcrypt => Arc::new(BcryptHasher::development()),
        }
    }

    /// Detect the algorithm from a stored PHC / modular-crypt string
    pub fn detect(hash: &str) -> Option<Self> {
        if hash.starts_with("$argon2") {
            Some(Self::Argon2)
        } else if hash.starts_with("$2") {
            Some(Self::Bcrypt)
        } else {
            None
        }
    }
}

/// Argon2id hasher
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Argon2Hasher {
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// Create an Argon2 hasher optimized for development (faster)
    pub fn development() -> Self {
        Self::new(4096, 2, 1)
    }

    fn argon2(&self) -> AuthResult<Argon2<'static>> {
        let params = argon2::Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|e| AuthError::crypto_error(e.to_string()))?;
        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new(65536, 3, 4)
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut thread_rng());
        let hash = self.argon2()?.hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(hash)?;
        // parameters are read from the hash itself
        match self.argon2()?.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn hasher_name(&self) -> &str {
        "argon2"
    }
}

/// bcrypt password hasher implementation
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn development() -> Self {
        Self { cost: 4 }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        bcrypt::hash(password, self.cost).map_err(AuthError::from)
    }

    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<bool> {
        bcrypt::verify(password, hash).map_err(AuthError::from)
    }

    fn hasher_name(&self) -> &str {
        "bcrypt"
    }
}

/// Verify against whichever algorithm produced `hash`.
///
/// Accounts hashed before a `PASSWORD_HASHER` switch keep working.
pub fn verify_any(password: &str, hash: &str) -> AuthResult<bool> {
    match HashAlgorithm::detect(hash) {
        Some(HashAlgorithm::Argon2) => Argon2Hasher::default().verify_password(password, hash),
        Some(HashAlgorithm::Bcrypt) => BcryptHasher::default().verify_password(password, hash),
        None => Err(AuthError::crypto_error("Unrecognized password hash format")),
    }
}
