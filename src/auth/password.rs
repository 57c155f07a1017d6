//! Password hashing and verification.
//!
//! New hashes are Argon2id PHC strings with a random salt. Accounts created
//! before the switch store an unsalted SHA-256 hex digest; those still verify
//! and are flagged for rehashing so the login path can upgrade them.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AuthError;

/// Hash a plaintext password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verify a plaintext password against a stored hash of either format.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    if is_legacy_digest(stored) {
        let computed = legacy_digest(password);
        return Ok(computed
            .as_bytes()
            .ct_eq(stored.to_ascii_lowercase().as_bytes())
            .into());
    }

    let parsed = PasswordHash::new(stored).map_err(|e| AuthError::Hashing(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hashing(e.to_string())),
    }
}

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH
        .get_or_init(|| hash_password("element-labeler-dummy").ok())
        .as_deref()
}

/// Run a full Argon2 verification against a fixed hash and discard the result.
///
/// Called when no account matches, so an unknown contact number costs the
/// same work as a wrong password.
pub fn verify_dummy(password: &str) {
    if let Some(hash) = dummy_hash() {
        let _ = verify_password(password, hash);
    }
}

/// Whether a stored hash should be replaced by a fresh Argon2id hash.
pub fn needs_rehash(stored: &str) -> bool {
    is_legacy_digest(stored)
}

/// Unsalted SHA-256 hex digest, the format of pre-Argon2 accounts.
pub fn legacy_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn is_legacy_digest(stored: &str) -> bool {
    stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit())
}
