//! Password hashing using argon2
//!
//! New hashes are Argon2id PHC strings. Verification also understands
//! bcrypt hashes (`$2a$`, `$2b$`, `$2y$`) so accounts carried over from
//! older deployments can still sign in.
//!
//! # Performance Considerations
//!
//! Both algorithms are intentionally CPU-intensive. The async trait methods
//! run them on the blocking thread pool so they never stall the runtime.

use anyhow::Result;
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;

/// One-way hashing of plaintext passwords
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password for storage
    async fn hash(&self, plaintext: &str) -> Result<String>;

    /// Check a plaintext password against a stored hash
    ///
    /// `Ok(false)` means a mismatch; `Err` means the hash itself is unusable.
    async fn verify(&self, plaintext: &str, hash: &str) -> Result<bool>;
}

/// Hash checked when an account doesn't exist, so a miss costs as much as a
/// wrong password.
pub static DUMMY_HASH: Lazy<String> =
    Lazy::new(|| PasswordService::hash("timing-equalizer-not-a-password").unwrap_or_default());

/// Argon2id password hashing service
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordService;

impl PasswordService {
    /// Hash a password using argon2 (blocking operation)
    pub fn hash(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    /// Verify a password against an argon2 or bcrypt hash (blocking operation)
    pub fn verify(password: &str, hash: &str) -> Result<bool> {
        if is_bcrypt(hash) {
            return bcrypt::verify(password, hash)
                .map_err(|e| anyhow::anyhow!("Invalid bcrypt hash: {}", e));
        }

        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid hash format: {}", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[async_trait]
impl PasswordHasher for PasswordService {
    async fn hash(&self, plaintext: &str) -> Result<String> {
        let plaintext = plaintext.to_owned();
        tokio::task::spawn_blocking(move || Self::hash(&plaintext))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    async fn verify(&self, plaintext: &str, hash: &str) -> Result<bool> {
        let plaintext = plaintext.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || Self::verify(&plaintext, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }
}

fn is_bcrypt(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"].iter().any(|prefix| hash.starts_with(prefix))
}
