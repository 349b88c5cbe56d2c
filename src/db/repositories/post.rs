//! Post repository
//!
//! Database operations for blog posts. A post and its tag set are always
//! written in one transaction.

use super::search_key;
use super::tag::{set_post_tags, tags_for_posts};
use crate::db::DbPool;
use crate::models::{ListParams, Post, PostFilter, PostWithMeta};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post together with its tags
    async fn create(&self, post: &Post, tags: &[String]) -> Result<PostWithMeta>;

    async fn get_by_id(&self, id: i64) -> Result<Option<PostWithMeta>>;

    /// Newest first, filtered, paginated
    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<(Vec<PostWithMeta>, i64)>;

    /// Save title and content; `tags: Some(..)` replaces the tag set
    async fn update(&self, post: &Post, tags: Option<&[String]>) -> Result<PostWithMeta>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DbPool,
}

impl SqlxPostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.author_id, p.created_at, p.updated_at,
           u.username AS author_username
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post, tags: &[String]) -> Result<PostWithMeta> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query(
            r#"
            INSERT INTO posts (title, title_key, content, content_key, author_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.title)
        .bind(search_key(&post.title))
        .bind(&post.content)
        .bind(search_key(&post.content))
        .bind(post.author_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create post")?;
        let id = result.last_insert_rowid();

        set_post_tags(&mut tx, id, tags).await?;
        let created = fetch_post(&mut tx, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after insert"))?;

        tx.commit().await.context("Failed to commit post")?;
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PostWithMeta>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        fetch_post(&mut conn, id).await
    }

    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<(Vec<PostWithMeta>, i64)> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;

        let mut count_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) as count FROM posts p");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build()
            .fetch_one(&mut *conn)
            .await
            .context("Failed to count posts")?
            .get("count");

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(POST_SELECT);
        push_filters(&mut query, filter);
        query.push(" ORDER BY p.id DESC LIMIT ");
        query.push_bind(params.limit());
        query.push(" OFFSET ");
        query.push_bind(params.offset());

        let rows = query
            .build()
            .fetch_all(&mut *conn)
            .await
            .context("Failed to list posts")?;

        let posts = attach_tags(&mut conn, &rows).await?;
        Ok((posts, total))
    }

    async fn update(&self, post: &Post, tags: Option<&[String]>) -> Result<PostWithMeta> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            "UPDATE posts SET title = ?, title_key = ?, content = ?, content_key = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&post.title)
        .bind(search_key(&post.title))
        .bind(&post.content)
        .bind(search_key(&post.content))
        .bind(Utc::now())
        .bind(post.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update post")?;

        if let Some(tags) = tags {
            set_post_tags(&mut tx, post.id, tags).await?;
        }
        let updated = fetch_post(&mut tx, post.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after update"))?;

        tx.commit().await.context("Failed to commit post")?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete post")?;

        Ok(result.rows_affected() > 0)
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &PostFilter) {
    query.push(" WHERE 1 = 1");

    if let Some(q) = &filter.q {
        let needle = search_key(q);
        query.push(" AND (instr(p.title_key, ");
        query.push_bind(needle.clone());
        query.push(") > 0 OR instr(p.content_key, ");
        query.push_bind(needle.clone());
        query.push(
            ") > 0 OR EXISTS (SELECT 1 FROM post_tags pt JOIN tags t ON t.id = pt.tag_id \
             WHERE pt.post_id = p.id AND instr(t.name_key, ",
        );
        query.push_bind(needle);
        query.push(") > 0))");
    }
    if let Some(tag_name) = &filter.tag_name {
        query.push(
            " AND EXISTS (SELECT 1 FROM post_tags pt JOIN tags t ON t.id = pt.tag_id \
             WHERE pt.post_id = p.id AND t.name = ",
        );
        query.push_bind(tag_name.trim().to_string());
        query.push(" COLLATE NOCASE)");
    }
}

async fn fetch_post(conn: &mut SqliteConnection, id: i64) -> Result<Option<PostWithMeta>> {
    let sql = format!("{} WHERE p.id = ?", POST_SELECT);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(attach_tags(conn, std::slice::from_ref(&row)).await?.pop()),
        None => Ok(None),
    }
}

async fn attach_tags(conn: &mut SqliteConnection, rows: &[SqliteRow]) -> Result<Vec<PostWithMeta>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.get("id")).collect();
    let mut tags = tags_for_posts(conn, &ids).await?;

    Ok(rows
        .iter()
        .map(|row| {
            let post = row_to_post(row);
            PostWithMeta {
                tags: tags.remove(&post.id).unwrap_or_default(),
                author_username: row.get("author_username"),
                post,
            }
        })
        .collect())
}

fn row_to_post(row: &SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
