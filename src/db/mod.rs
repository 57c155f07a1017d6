//! Document database adapter for users and auth tokens.
//!
//! The [`Database`] trait is the seam between the auth service and storage.
//! Two backends implement it:
//!
//! - [`PgDatabase`]: PostgreSQL through sqlx. The pool is created lazily on
//!   first use and reused for the life of the process.
//! - [`MemoryDatabase`]: in-process maps, for development and tests.
//!
//! Backends are selected from the database URL with [`DatabaseUrl::parse`].

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DbError;

pub use memory::MemoryDatabase;
pub use postgres::{PgDatabase, DEFAULT_MAX_CONNECTIONS};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub contact_number: String,
    /// Password hash (Argon2id PHC string, or a legacy SHA-256 hex digest)
    #[serde(rename = "password")]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The active bearer token of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub user_id: Uuid,
    pub token: String,
    pub contact_number: String,
    pub created_at: DateTime<Utc>,
}

/// Storage operations needed by the auth service.
///
/// Implementations connect lazily; [`ensure_connected`](Database::ensure_connected)
/// forces the connection and verifies it, and may be called any number of
/// times.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Connect if not yet connected and check the connection is usable.
    async fn ensure_connected(&self) -> Result<(), DbError>;

    /// Look up a user by contact number.
    async fn find_user_by_contact(&self, contact_number: &str) -> Result<Option<User>, DbError>;

    /// Look up a user by id.
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DbError>;

    /// Insert a new user.
    ///
    /// Fails with [`DbError::Duplicate`] when the contact number is taken.
    async fn insert_user(&self, user: &User) -> Result<(), DbError>;

    /// Replace a user's stored password hash.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DbError>;

    /// Store `token` as the only token of its user, replacing any previous one.
    async fn upsert_token(&self, token: &AuthToken) -> Result<(), DbError>;

    /// Look up a token record by token value.
    async fn find_token(&self, token: &str) -> Result<Option<AuthToken>, DbError>;

    /// Delete a token record. Returns whether a record was deleted.
    async fn delete_token(&self, token: &str) -> Result<bool, DbError>;
}

/// A parsed database connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// `memory://` - process-local storage, lost on exit
    Memory,
    /// `postgres://...` or `postgresql://...`
    Postgres(String),
}

impl DatabaseUrl {
    /// Parse a database URL, rejecting unsupported schemes.
    pub fn parse(url: &str) -> Result<Self, DbError> {
        let url = url.trim();
        if url == "memory://" || url == "memory" {
            Ok(DatabaseUrl::Memory)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DatabaseUrl::Postgres(url.to_string()))
        } else {
            Err(DbError::Configuration(format!(
                "unsupported database URL '{}' (expected postgres://... or memory://)",
                redact(url)
            )))
        }
    }
}

/// Strip credentials from a connection string before logging it.
pub fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            let _ = parsed.set_username("***");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => url.split('@').last().unwrap_or_default().to_string(),
    }
}

/// Whether `name` is usable as an unquoted SQL schema identifier.
pub fn is_valid_schema_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
