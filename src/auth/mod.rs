//! User registration, login and bearer token sessions.
//!
//! # Flow
//!
//! ```text
//! register(contact, password)  -> user id
//! login(contact, password)     -> token   (replaces the user's previous token)
//! resolve_token(token)         -> identity | unauthenticated
//! logout(token)                -> always succeeds
//! ```
//!
//! Each user holds at most one token; logging in again invalidates the
//! previous one. Tokens expire after the configured session lifetime.

mod password;
mod token;

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{AuthToken, Database, User};
use crate::error::{AuthError, DbError};

pub use password::{hash_password, legacy_digest, needs_rehash, verify_dummy, verify_password};
pub use token::{generate_token, TOKEN_NONCE_BYTES};

/// Default session lifetime in days.
pub const DEFAULT_SESSION_TTL_DAYS: u32 = 7;

/// Longest accepted session lifetime in days.
pub const MAX_SESSION_TTL_DAYS: u32 = 3650;

/// A successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSession {
    pub token: String,
    pub user_id: Uuid,
    pub contact_number: String,
}

/// The user behind a valid token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    #[serde(skip)]
    pub user_id: Uuid,
    #[serde(rename = "contactNumber")]
    pub contact_number: String,
}

/// Why a token did not resolve to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unauthenticated {
    /// No bearer token was presented
    MissingToken,
    /// Unknown token, or one past its lifetime
    InvalidToken,
    /// The token's user no longer exists
    UserNotFound,
}

impl Unauthenticated {
    pub fn message(&self) -> &'static str {
        match self {
            Unauthenticated::MissingToken => "Not authenticated",
            Unauthenticated::InvalidToken => "Invalid or expired token",
            Unauthenticated::UserNotFound => "User not found",
        }
    }
}

/// Outcome of [`AuthService::resolve_token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenResolution {
    Authenticated(Identity),
    Unauthenticated(Unauthenticated),
}

/// Auth operations over a [`Database`].
pub struct AuthService<D: Database> {
    db: Arc<D>,
    session_ttl: Duration,
}

impl<D: Database> AuthService<D> {
    /// Create a service with the default session lifetime.
    pub fn new(db: Arc<D>) -> Self {
        Self {
            db,
            session_ttl: Duration::days(i64::from(DEFAULT_SESSION_TTL_DAYS)),
        }
    }

    /// Set how long a token stays valid after login.
    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    pub fn database(&self) -> &Arc<D> {
        &self.db
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Register a new user and return its id.
    pub async fn register(&self, contact_number: &str, password: &str) -> Result<Uuid, AuthError> {
        if contact_number.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        if self.db.find_user_by_contact(contact_number).await?.is_some() {
            return Err(AuthError::AlreadyRegistered);
        }

        let user = User {
            id: Uuid::new_v4(),
            contact_number: contact_number.to_string(),
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        };

        match self.db.insert_user(&user).await {
            Ok(()) => {}
            // Lost a race with a concurrent registration
            Err(DbError::Duplicate(_)) => return Err(AuthError::AlreadyRegistered),
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, "Registered user");
        Ok(user.id)
    }

    /// Check credentials and issue a new token.
    ///
    /// Unknown contact numbers and wrong passwords both fail with
    /// [`AuthError::InvalidCredentials`].
    pub async fn login(&self, contact_number: &str, password: &str) -> Result<LoginSession, AuthError> {
        if contact_number.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let Some(user) = self.db.find_user_by_contact(contact_number).await? else {
            verify_dummy(password);
            debug!("Login failed: unknown contact number");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            debug!(user_id = %user.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if needs_rehash(&user.password_hash) {
            let upgraded = hash_password(password)?;
            self.db.update_password(user.id, &upgraded).await?;
            info!(user_id = %user.id, "Upgraded legacy password hash");
        }

        let token = AuthToken {
            user_id: user.id,
            token: generate_token(user.id),
            contact_number: user.contact_number.clone(),
            created_at: Utc::now(),
        };
        self.db.upsert_token(&token).await?;

        info!(user_id = %user.id, "Issued auth token");
        Ok(LoginSession {
            token: token.token,
            user_id: user.id,
            contact_number: user.contact_number,
        })
    }

    /// Revoke `token`. Returns whether a token was deleted.
    pub async fn logout(&self, token: Option<&str>) -> Result<bool, AuthError> {
        let Some(token) = token else {
            return Ok(false);
        };

        let deleted = self.db.delete_token(token).await?;
        if deleted {
            info!("Token revoked");
        } else {
            debug!("Logout with unknown token");
        }
        Ok(deleted)
    }

    /// Resolve a bearer token to the user it belongs to.
    ///
    /// Stale tokens (expired, or whose user is gone) are deleted on the way.
    pub async fn resolve_token(&self, token: Option<&str>) -> Result<TokenResolution, AuthError> {
        let Some(token) = token else {
            return Ok(TokenResolution::Unauthenticated(Unauthenticated::MissingToken));
        };

        let Some(record) = self.db.find_token(token).await? else {
            return Ok(TokenResolution::Unauthenticated(Unauthenticated::InvalidToken));
        };

        // A lifetime too long to represent never expires
        let expired = record
            .created_at
            .checked_add_signed(self.session_ttl)
            .is_some_and(|expires_at| expires_at < Utc::now());
        if expired {
            self.db.delete_token(token).await?;
            debug!(user_id = %record.user_id, "Deleted expired token");
            return Ok(TokenResolution::Unauthenticated(Unauthenticated::InvalidToken));
        }

        if self.db.find_user(record.user_id).await?.is_none() {
            self.db.delete_token(token).await?;
            warn!(user_id = %record.user_id, "Deleted token of missing user");
            return Ok(TokenResolution::Unauthenticated(Unauthenticated::UserNotFound));
        }

        Ok(TokenResolution::Authenticated(Identity {
            user_id: record.user_id,
            contact_number: record.contact_number,
        }))
    }
}
