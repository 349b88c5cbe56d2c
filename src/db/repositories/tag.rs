//! Tag repository
//!
//! Tags are created on first use when a post is saved. The helpers
//! `set_post_tags` and `tags_for_posts` are shared with the post repository so
//! tag writes happen inside the post's transaction.

use super::search_key;
use crate::db::DbPool;
use crate::models::{normalize_tag_names, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::collections::HashMap;
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Find a tag by name, ignoring case
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// All tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Tags attached to a post ordered by name
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Tag>>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DbPool,
}

impl SqlxTagRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name FROM tags WHERE name = ? COLLATE NOCASE")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get tag by name")?;

        Ok(row.as_ref().map(row_to_tag))
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name FROM tags ORDER BY name COLLATE NOCASE")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list tags")?;

        Ok(rows.iter().map(row_to_tag).collect())
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Tag>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let mut tags = tags_for_posts(&mut conn, &[post_id]).await?;
        Ok(tags.remove(&post_id).unwrap_or_default())
    }
}

/// Replace the tag set of a post, creating missing tags.
pub(crate) async fn set_post_tags<S: AsRef<str>>(
    conn: &mut SqliteConnection,
    post_id: i64,
    names: &[S],
) -> Result<()> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *conn)
        .await
        .context("Failed to clear post tags")?;

    for name in normalize_tag_names(names) {
        sqlx::query("INSERT OR IGNORE INTO tags (name, name_key) VALUES (?, ?)")
            .bind(&name)
            .bind(search_key(&name))
            .execute(&mut *conn)
            .await
            .context("Failed to create tag")?;

        let tag_id: i64 = sqlx::query("SELECT id FROM tags WHERE name = ? COLLATE NOCASE")
            .bind(&name)
            .fetch_one(&mut *conn)
            .await
            .context("Failed to read tag")?
            .get("id");

        sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await
            .context("Failed to attach tag")?;
    }

    Ok(())
}

/// Tags of several posts, keyed by post id
pub(crate) async fn tags_for_posts(
    conn: &mut SqliteConnection,
    post_ids: &[i64],
) -> Result<HashMap<i64, Vec<Tag>>> {
    let mut by_post: HashMap<i64, Vec<Tag>> = HashMap::new();
    if post_ids.is_empty() {
        return Ok(by_post);
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT pt.post_id, t.id, t.name FROM post_tags pt JOIN tags t ON t.id = pt.tag_id WHERE pt.post_id IN (",
    );
    let mut separated = query.separated(", ");
    for id in post_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY t.name COLLATE NOCASE");

    let rows = query
        .build()
        .fetch_all(&mut *conn)
        .await
        .context("Failed to load post tags")?;

    for row in &rows {
        by_post
            .entry(row.get("post_id"))
            .or_default()
            .push(row_to_tag(row));
    }
    Ok(by_post)
}

fn row_to_tag(row: &SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DbPool, SqlxTagRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (1, 'w', 'w@example.com', 'x')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO posts (id, title, content, author_id) VALUES (1, 'One', 'body', 1), (2, 'Two', 'body', 1)")
            .execute(&pool)
            .await
            .unwrap();
        (pool.clone(), SqlxTagRepository::new(pool))
    }

    #[tokio::test]
    async fn test_set_post_tags_creates_and_dedupes() {
        let (pool, repo) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        set_post_tags(&mut conn, 1, &["Rust", " rust ", "axum"]).await.unwrap();
        set_post_tags(&mut conn, 2, &["RUST"]).await.unwrap();
        drop(conn);

        let all = repo.list().await.unwrap();
        let names: Vec<_> = all.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["axum", "Rust"]);

        let tags = repo.list_for_post(2).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Rust");
    }

    #[tokio::test]
    async fn test_set_post_tags_replaces() {
        let (pool, repo) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        set_post_tags(&mut conn, 1, &["old"]).await.unwrap();
        set_post_tags(&mut conn, 1, &["new"]).await.unwrap();
        drop(conn);

        let names: Vec<_> = repo
            .list_for_post(1)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["new"]);
    }

    #[tokio::test]
    async fn test_get_by_name_ignores_case() {
        let (pool, repo) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        set_post_tags(&mut conn, 1, &["Medieval"]).await.unwrap();
        drop(conn);

        let tag = repo.get_by_name("medieval").await.unwrap();

        assert_eq!(tag.map(|t| t.name), Some("Medieval".to_string()));
        assert!(repo.get_by_name("modern").await.unwrap().is_none());
    }
}
