//! Password hashing and bearer token generation

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use uuid::Uuid;

use crate::error::{Result, WalletError};

/// Hash a password using Argon2id (PHC string, salt embedded)
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| WalletError::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a password against a stored PHC hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| WalletError::Internal(format!("stored password hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| WalletError::InvalidPassword)
}

/// Opaque random bearer token (two v4 UUIDs, 244 random bits)
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Accept both `Bearer <token>` and a bare token
pub fn parse_bearer(header: &str) -> Option<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .unwrap_or(header)
        .trim();

    (!token.is_empty()).then_some(token)
}
