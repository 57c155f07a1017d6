//! Opaque bearer token generation.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Random bytes mixed into every token.
pub const TOKEN_NONCE_BYTES: usize = 16;

/// Generate a fresh token for `user_id`.
///
/// The token is the hex SHA-256 of the user id joined with random bytes, so
/// it is 64 hex characters and reveals nothing about the user.
pub fn generate_token(user_id: Uuid) -> String {
    let mut nonce = [0u8; TOKEN_NONCE_BYTES];
    OsRng.fill_bytes(&mut nonce);

    let material = format!("{}-{}", user_id, hex::encode(nonce));
    hex::encode(Sha256::digest(material.as_bytes()))
}
