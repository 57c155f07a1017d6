//! PostgreSQL backend.
//!
//! Users and tokens live in two tables inside a dedicated schema (the
//! configured database name). The schema and tables are created on first
//! connect.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbError;

use super::{is_valid_schema_name, redact, AuthToken, Database, User};

/// Default size of the connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// [`Database`] backed by PostgreSQL.
///
/// Construction does not touch the network. The pool is created by the first
/// operation (or [`ensure_connected`](Database::ensure_connected)) and shared
/// by every later call.
pub struct PgDatabase {
    url: String,
    schema: String,
    max_connections: u32,
    pool: OnceCell<PgPool>,
}

impl PgDatabase {
    /// Create an unconnected handle.
    ///
    /// `schema` must be a plain SQL identifier.
    pub fn new(url: impl Into<String>, schema: impl Into<String>) -> Result<Self, DbError> {
        let schema = schema.into();
        if !is_valid_schema_name(&schema) {
            return Err(DbError::Configuration(format!(
                "invalid database name '{}': use letters, digits and underscores",
                schema
            )));
        }

        Ok(Self {
            url: url.into(),
            schema,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            pool: OnceCell::new(),
        })
    }

    /// Set the connection pool size.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn is_connected(&self) -> bool {
        self.pool.initialized()
    }

    /// The shared pool, connecting on first use.
    async fn pool(&self) -> Result<&PgPool, DbError> {
        self.pool
            .get_or_try_init(|| async {
                info!(url = %redact(&self.url), schema = %self.schema, "Connecting to database");

                let pool = PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&self.url)
                    .await
                    .map_err(|e| DbError::Connection(e.to_string()))?;

                self.create_tables(&pool).await?;
                Ok::<_, DbError>(pool)
            })
            .await
    }

    async fn create_tables(&self, pool: &PgPool) -> Result<(), DbError> {
        let statements = [
            format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema),
            format!(
                "CREATE TABLE IF NOT EXISTS {}.users (
                    id UUID PRIMARY KEY,
                    contact_number TEXT NOT NULL UNIQUE,
                    password TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL
                )",
                self.schema
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {}.auth_tokens (
                    user_id UUID PRIMARY KEY,
                    token TEXT NOT NULL UNIQUE,
                    contact_number TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL
                )",
                self.schema
            ),
        ];

        for statement in &statements {
            sqlx::query(statement).execute(pool).await?;
        }

        debug!(schema = %self.schema, "Database tables ready");
        Ok(())
    }

    fn users(&self) -> String {
        format!("{}.users", self.schema)
    }

    fn tokens(&self) -> String {
        format!("{}.auth_tokens", self.schema)
    }
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> Result<User, DbError> {
    Ok(User {
        id: row.try_get::<Uuid, _>("id")?,
        contact_number: row.try_get("contact_number")?,
        password_hash: row.try_get("password")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn token_from_row(row: &sqlx::postgres::PgRow) -> Result<AuthToken, DbError> {
    Ok(AuthToken {
        user_id: row.try_get::<Uuid, _>("user_id")?,
        token: row.try_get("token")?,
        contact_number: row.try_get("contact_number")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl Database for PgDatabase {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ensure_connected(&self) -> Result<(), DbError> {
        let pool = self.pool().await?;
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn find_user_by_contact(&self, contact_number: &str) -> Result<Option<User>, DbError> {
        let sql = format!(
            "SELECT id, contact_number, password, created_at FROM {} WHERE contact_number = $1",
            self.users()
        );
        let row = sqlx::query(&sql)
            .bind(contact_number)
            .fetch_optional(self.pool().await?)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let sql = format!(
            "SELECT id, contact_number, password, created_at FROM {} WHERE id = $1",
            self.users()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool().await?)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO {} (id, contact_number, password, created_at) VALUES ($1, $2, $3, $4)",
            self.users()
        );
        sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.contact_number)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .execute(self.pool().await?)
            .await?;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DbError> {
        let sql = format!("UPDATE {} SET password = $2 WHERE id = $1", self.users());
        sqlx::query(&sql)
            .bind(id)
            .bind(password_hash)
            .execute(self.pool().await?)
            .await?;
        Ok(())
    }

    async fn upsert_token(&self, token: &AuthToken) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO {} (user_id, token, contact_number, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id) DO UPDATE
             SET token = EXCLUDED.token,
                 contact_number = EXCLUDED.contact_number,
                 created_at = EXCLUDED.created_at",
            self.tokens()
        );
        sqlx::query(&sql)
            .bind(token.user_id)
            .bind(&token.token)
            .bind(&token.contact_number)
            .bind(token.created_at)
            .execute(self.pool().await?)
            .await?;
        Ok(())
    }

    async fn find_token(&self, token: &str) -> Result<Option<AuthToken>, DbError> {
        let sql = format!(
            "SELECT user_id, token, contact_number, created_at FROM {} WHERE token = $1",
            self.tokens()
        );
        let row = sqlx::query(&sql)
            .bind(token)
            .fetch_optional(self.pool().await?)
            .await?;
        row.as_ref().map(token_from_row).transpose()
    }

    async fn delete_token(&self, token: &str) -> Result<bool, DbError> {
        let sql = format!("DELETE FROM {} WHERE token = $1", self.tokens());
        let result = sqlx::query(&sql)
            .bind(token)
            .execute(self.pool().await?)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
