//! Session and API token repositories
//!
//! This module provides:
//! - `SessionRepository` / `SqlxSessionRepository` for expiring login sessions
//! - `ApiTokenRepository` / `SqlxApiTokenRepository` for the per-user API key

use crate::db::DbPool;
use crate::models::{ApiToken, Session};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions for a user
    async fn delete_by_user(&self, user_id: i64) -> Result<()>;

    /// Delete expired sessions
    async fn delete_expired(&self) -> Result<i64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DbPool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to create session")?;

        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, expires_at, created_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get session by ID")?;

        Ok(row.as_ref().map(row_to_session))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete sessions by user")?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<i64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("Failed to delete expired sessions")?;

        Ok(result.rows_affected() as i64)
    }
}

fn row_to_session(row: &SqliteRow) -> Session {
    Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }
}

/// API token repository trait
#[async_trait]
pub trait ApiTokenRepository: Send + Sync {
    /// Look up a token by its key
    async fn get_by_key(&self, key: &str) -> Result<Option<ApiToken>>;

    /// Return the user's token, creating it with `new_key` if absent
    async fn get_or_create(&self, user_id: i64, new_key: &str) -> Result<ApiToken>;
}

/// SQLx-based API token repository implementation
pub struct SqlxApiTokenRepository {
    pool: DbPool,
}

impl SqlxApiTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn ApiTokenRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ApiTokenRepository for SqlxApiTokenRepository {
    async fn get_by_key(&self, key: &str) -> Result<Option<ApiToken>> {
        let row = sqlx::query("SELECT key, user_id, created_at FROM api_tokens WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get API token")?;

        Ok(row.as_ref().map(row_to_token))
    }

    async fn get_or_create(&self, user_id: i64, new_key: &str) -> Result<ApiToken> {
        sqlx::query(
            "INSERT INTO api_tokens (key, user_id, created_at) VALUES (?, ?, ?) ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(new_key)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to create API token")?;

        let row = sqlx::query("SELECT key, user_id, created_at FROM api_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to read API token")?;

        Ok(row_to_token(&row))
    }
}

fn row_to_token(row: &SqliteRow) -> ApiToken {
    ApiToken {
        key: row.get("key"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
    }
}
