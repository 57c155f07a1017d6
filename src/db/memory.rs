//! In-process database backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::DbError;

use super::{AuthToken, Database, User};

/// [`Database`] backed by in-memory maps.
///
/// Data lives as long as the value. Used for `memory://` URLs and tests.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    users: RwLock<HashMap<Uuid, User>>,
    /// Tokens keyed by user id, one per user
    tokens: RwLock<HashMap<Uuid, AuthToken>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a user. Tokens are left in place.
    pub async fn remove_user(&self, id: Uuid) -> Option<User> {
        self.users.write().await.remove(&id)
    }

    /// Number of stored tokens.
    pub async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ensure_connected(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn find_user_by_contact(&self, contact_number: &str) -> Result<Option<User>, DbError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.contact_number == contact_number)
            .cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DbError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.contact_number == user.contact_number)
        {
            return Err(DbError::Duplicate(format!(
                "contact number {}",
                user.contact_number
            )));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DbError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn upsert_token(&self, token: &AuthToken) -> Result<(), DbError> {
        self.tokens
            .write()
            .await
            .insert(token.user_id, token.clone());
        Ok(())
    }

    async fn find_token(&self, token: &str) -> Result<Option<AuthToken>, DbError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.values().find(|t| t.token == token).cloned())
    }

    async fn delete_token(&self, token: &str) -> Result<bool, DbError> {
        let mut tokens = self.tokens.write().await;
        let user_id = tokens
            .values()
            .find(|t| t.token == token)
            .map(|t| t.user_id);

        Ok(match user_id {
            Some(user_id) => tokens.remove(&user_id).is_some(),
            None => false,
        })
    }
}
