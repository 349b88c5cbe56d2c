//! User repository
//!
//! Database operations for users and their profiles.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite
//!
//! Account creation writes the user row, its profile and its API token in a
//! single transaction, so a user never exists without a profile.

use crate::db::DbPool;
use crate::models::{ApiToken, User, UserProfile, UserRole, UserWithProfile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;

/// Unique constraint hit while creating an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccountConflict {
    #[error("username already taken")]
    Username,
    #[error("email already registered")]
    Email,
}

/// Rows written by a successful account creation
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub user: User,
    pub profile: UserProfile,
    pub token: ApiToken,
}

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create user, profile and API token atomically.
    ///
    /// When no user exists yet the profile role is forced to `Admin`,
    /// otherwise `profile.role` is stored as given.
    async fn create_account(
        &self,
        user: &User,
        profile: &UserProfile,
        token_key: &str,
    ) -> Result<CreatedAccount>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email, ignoring case
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update name and email fields of a user
    async fn update(&self, user: &User) -> Result<User>;

    /// Get the profile of a user
    async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>>;

    /// Update bio and avatar of a profile
    async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile>;

    /// Change a user's role; returns false when the user has no profile
    async fn set_role(&self, user_id: i64, role: UserRole) -> Result<bool>;

    /// Count total users
    async fn count(&self) -> Result<i64>;

    /// List users with their profiles, oldest first
    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<UserWithProfile>, i64)>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create_account(
        &self,
        user: &User,
        profile: &UserProfile,
        token_key: &str,
    ) -> Result<CreatedAccount> {
        create_account(&self.pool, user, profile, token_key).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        get_user_by_id(&self.pool, id).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        get_user_by_username(&self.pool, username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        get_user_by_email(&self.pool, email).await
    }

    async fn update(&self, user: &User) -> Result<User> {
        update_user(&self.pool, user).await
    }

    async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>> {
        get_profile(&self.pool, user_id).await
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile> {
        update_profile(&self.pool, profile).await
    }

    async fn set_role(&self, user_id: i64, role: UserRole) -> Result<bool> {
        let result = sqlx::query("UPDATE user_profiles SET role = ? WHERE user_id = ?")
            .bind(role.to_string())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to set user role")?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        count_users(&self.pool).await
    }

    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<UserWithProfile>, i64)> {
        list_users(&self.pool, page, per_page).await
    }
}

/// Map a unique violation on `users` to the column that collided
fn user_insert_error(err: sqlx::Error) -> anyhow::Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if message.contains("users.email") {
                return AccountConflict::Email.into();
            }
            if message.contains("users.username") {
                return AccountConflict::Username.into();
            }
        }
    }
    anyhow::Error::new(err).context("Failed to create user")
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, created_at, updated_at";

async fn create_account(
    pool: &DbPool,
    user: &User,
    profile: &UserProfile,
    token_key: &str,
) -> Result<CreatedAccount> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    // Counted inside the transaction so two concurrent first registrations
    // cannot both become admin.
    let existing: i64 = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count users")?
        .get("count");
    let role = if existing == 0 {
        UserRole::Admin
    } else {
        profile.role
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, first_name, last_name, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(user_insert_error)?;
    let user_id = result.last_insert_rowid();

    sqlx::query("INSERT INTO user_profiles (user_id, role, bio, avatar) VALUES (?, ?, ?, ?)")
        .bind(user_id)
        .bind(role.to_string())
        .bind(&profile.bio)
        .bind(&profile.avatar)
        .execute(&mut *tx)
        .await
        .context("Failed to create user profile")?;

    sqlx::query("INSERT INTO api_tokens (key, user_id, created_at) VALUES (?, ?, ?)")
        .bind(token_key)
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create API token")?;

    tx.commit().await.context("Failed to commit account creation")?;

    Ok(CreatedAccount {
        user: User {
            id: user_id,
            created_at: now,
            updated_at: now,
            ..user.clone()
        },
        profile: UserProfile {
            user_id,
            role,
            ..profile.clone()
        },
        token: ApiToken {
            key: token_key.to_string(),
            user_id,
            created_at: now,
        },
    })
}

async fn get_user_by_id(pool: &DbPool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user).transpose()
}

async fn get_user_by_username(pool: &DbPool, username: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;

    row.as_ref().map(row_to_user).transpose()
}

async fn get_user_by_email(pool: &DbPool, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ? COLLATE NOCASE", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    row.as_ref().map(row_to_user).transpose()
}

async fn update_user(pool: &DbPool, user: &User) -> Result<User> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE users
        SET email = ?, first_name = ?, last_name = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn get_profile(pool: &DbPool, user_id: i64) -> Result<Option<UserProfile>> {
    let row = sqlx::query("SELECT user_id, role, bio, avatar FROM user_profiles WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user profile")?;

    row.as_ref().map(row_to_profile).transpose()
}

async fn update_profile(pool: &DbPool, profile: &UserProfile) -> Result<UserProfile> {
    sqlx::query("UPDATE user_profiles SET bio = ?, avatar = ? WHERE user_id = ?")
        .bind(&profile.bio)
        .bind(&profile.avatar)
        .bind(profile.user_id)
        .execute(pool)
        .await
        .context("Failed to update user profile")?;

    get_profile(pool, profile.user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Profile not found after update"))
}

async fn count_users(pool: &DbPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn list_users(
    pool: &DbPool,
    page: i64,
    per_page: i64,
) -> Result<(Vec<UserWithProfile>, i64)> {
    let offset = (page.max(1) - 1) * per_page;

    let rows = sqlx::query(
        r#"
        SELECT u.id, u.username, u.email, u.password_hash, u.first_name, u.last_name,
               u.created_at, u.updated_at,
               p.user_id AS profile_user_id, p.role, p.bio, p.avatar
        FROM users u
        LEFT JOIN user_profiles p ON p.user_id = u.id
        ORDER BY u.id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    let mut users = Vec::with_capacity(rows.len());
    for row in rows {
        let user = row_to_user(&row)?;
        let profile_user_id: Option<i64> = row.get("profile_user_id");
        let profile = match profile_user_id {
            Some(user_id) => {
                let role_str: String = row.get("role");
                Some(UserProfile {
                    user_id,
                    role: parse_role(&role_str)?,
                    bio: row.get("bio"),
                    avatar: row.get("avatar"),
                })
            }
            None => None,
        };
        users.push(UserWithProfile { user, profile });
    }

    let total = count_users(pool).await?;

    Ok((users, total))
}

fn parse_role(raw: &str) -> Result<UserRole> {
    UserRole::from_str(raw).with_context(|| format!("Invalid role in database: {}", raw))
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_profile(row: &SqliteRow) -> Result<UserProfile> {
    let role_str: String = row.get("role");
    Ok(UserProfile {
        user_id: row.get("user_id"),
        role: parse_role(&role_str)?,
        bio: row.get("bio"),
        avatar: row.get("avatar"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::services::password::hash_password;

    async fn setup_test_repo() -> (DbPool, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxUserRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_test_account(repo: &SqlxUserRepository, username: &str, email: &str) -> Result<CreatedAccount> {
        let user = User::new(
            username.to_string(),
            email.to_string(),
            hash_password("test_password").expect("Failed to hash password"),
        );
        let profile = UserProfile::new(0, UserRole::Member);
        repo.create_account(&user, &profile, &ApiToken::generate_key()).await
    }

    #[tokio::test]
    async fn test_first_account_becomes_admin() {
        let (_pool, repo) = setup_test_repo().await;

        let first = create_test_account(&repo, "first", "first@example.com")
            .await
            .expect("Failed to create account");
        let second = create_test_account(&repo, "second", "second@example.com")
            .await
            .expect("Failed to create account");

        assert_eq!(first.profile.role, UserRole::Admin);
        assert_eq!(second.profile.role, UserRole::Member);
    }

    #[tokio::test]
    async fn test_unique_violation_reports_column() {
        let (pool, repo) = setup_test_repo().await;
        create_test_account(&repo, "cadfael", "cadfael@abbey.org")
            .await
            .expect("Failed to create account");

        let same_name = create_test_account(&repo, "cadfael", "other@abbey.org")
            .await
            .unwrap_err();
        assert_eq!(
            same_name.downcast_ref::<AccountConflict>(),
            Some(&AccountConflict::Username)
        );

        let same_email = create_test_account(&repo, "brother", "CADFAEL@abbey.org")
            .await
            .unwrap_err();
        assert_eq!(
            same_email.downcast_ref::<AccountConflict>(),
            Some(&AccountConflict::Email)
        );

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 1);
    }

    #[tokio::test]
    async fn test_profile_and_token_created_with_user() {
        let (pool, repo) = setup_test_repo().await;

        let account = create_test_account(&repo, "reader", "reader@example.com")
            .await
            .expect("Failed to create account");

        let profile = repo
            .get_profile(account.user.id)
            .await
            .expect("Failed to get profile")
            .expect("Profile not found");
        assert_eq!(profile.user_id, account.user.id);

        let row = sqlx::query("SELECT COUNT(*) as count FROM user_profiles WHERE user_id = ?")
            .bind(account.user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.get::<i64, _>("count"), 1);

        let row = sqlx::query("SELECT key FROM api_tokens WHERE user_id = ?")
            .bind(account.user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("key"), account.token.key);
    }

    #[tokio::test]
    async fn test_failed_creation_leaves_nothing_behind() {
        let (pool, repo) = setup_test_repo().await;
        create_test_account(&repo, "taken", "one@example.com")
            .await
            .expect("Failed to create account");

        let result = create_test_account(&repo, "taken", "two@example.com").await;
        assert!(result.is_err(), "Should fail due to duplicate username");

        let row = sqlx::query("SELECT COUNT(*) as count FROM user_profiles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.get::<i64, _>("count"), 1);
    }

    #[tokio::test]
    async fn test_unique_email_ignores_case() {
        let (_pool, repo) = setup_test_repo().await;
        create_test_account(&repo, "user1", "Duplicate@Example.com")
            .await
            .expect("Failed to create first account");

        let result = create_test_account(&repo, "user2", "duplicate@example.com").await;

        assert!(result.is_err(), "Should fail due to duplicate email");
    }

    #[tokio::test]
    async fn test_get_by_email_ignores_case() {
        let (_pool, repo) = setup_test_repo().await;
        create_test_account(&repo, "mixed", "Mixed@Example.com")
            .await
            .expect("Failed to create account");

        let found = repo
            .get_by_email("mixed@example.COM")
            .await
            .expect("Failed to get user")
            .expect("User not found");

        assert_eq!(found.username, "mixed");
    }

    #[tokio::test]
    async fn test_get_by_username_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let found = repo
            .get_by_username("nonexistent")
            .await
            .expect("Failed to get user");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_update_user_and_profile() {
        let (_pool, repo) = setup_test_repo().await;
        let account = create_test_account(&repo, "editme", "edit@example.com")
            .await
            .expect("Failed to create account");

        let mut user = account.user.clone();
        user.first_name = "Brother".to_string();
        user.last_name = "Cadfael".to_string();
        let updated = repo.update(&user).await.expect("Failed to update user");
        assert_eq!(updated.first_name, "Brother");
        assert_eq!(updated.last_name, "Cadfael");

        let mut profile = account.profile.clone();
        profile.bio = "Herbalist".to_string();
        profile.avatar = Some("https://example.com/a.png".to_string());
        let updated = repo
            .update_profile(&profile)
            .await
            .expect("Failed to update profile");
        assert_eq!(updated.bio, "Herbalist");
        assert_eq!(updated.avatar.as_deref(), Some("https://example.com/a.png"));
    }

    #[tokio::test]
    async fn test_set_role() {
        let (_pool, repo) = setup_test_repo().await;
        create_test_account(&repo, "admin", "admin@example.com")
            .await
            .expect("Failed to create account");
        let member = create_test_account(&repo, "member", "member@example.com")
            .await
            .expect("Failed to create account");

        assert!(repo.set_role(member.user.id, UserRole::Librarian).await.unwrap());
        assert!(!repo.set_role(999, UserRole::Librarian).await.unwrap());

        let profile = repo.get_profile(member.user.id).await.unwrap().unwrap();
        assert_eq!(profile.role, UserRole::Librarian);
    }

    #[tokio::test]
    async fn test_list_users_with_profiles() {
        let (_pool, repo) = setup_test_repo().await;
        for i in 0..3 {
            create_test_account(&repo, &format!("user{}", i), &format!("user{}@example.com", i))
                .await
                .expect("Failed to create account");
        }

        let (users, total) = repo.list(1, 2).await.expect("Failed to list users");

        assert_eq!(total, 3);
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user.username, "user0");
        assert_eq!(users[0].profile.as_ref().map(|p| p.role), Some(UserRole::Admin));
    }

    #[tokio::test]
    async fn test_password_hash_stored_correctly() {
        let (_pool, repo) = setup_test_repo().await;
        let account = create_test_account(&repo, "hashtest", "hashtest@example.com")
            .await
            .expect("Failed to create account");

        let found = repo
            .get_by_id(account.user.id)
            .await
            .expect("Failed to get user")
            .expect("User not found");

        assert!(found.password_hash.starts_with("$argon2id$"));
    }
}
