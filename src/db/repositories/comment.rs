//! Comment repository

use crate::db::DbPool;
use crate::models::{Comment, CommentWithAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: &Comment) -> Result<CommentWithAuthor>;

    async fn get_by_id(&self, id: i64) -> Result<Option<CommentWithAuthor>>;

    /// Comments of a post, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;

    async fn update_content(&self, id: i64, content: &str) -> Result<Option<CommentWithAuthor>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DbPool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.author_id, c.content, c.created_at, c.updated_at,
           u.username AS author_username
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<CommentWithAuthor> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO comments (post_id, author_id, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create comment")?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Comment not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<CommentWithAuthor>> {
        let sql = format!("{} WHERE c.id = ?", COMMENT_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get comment by ID")?;

        Ok(row.as_ref().map(row_to_comment))
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let sql = format!("{} WHERE c.post_id = ? ORDER BY c.id", COMMENT_SELECT);
        let rows = sqlx::query(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list comments")?;

        Ok(rows.iter().map(row_to_comment).collect())
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<Option<CommentWithAuthor>> {
        let result = sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update comment")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete comment")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_comment(row: &SqliteRow) -> CommentWithAuthor {
    CommentWithAuthor {
        comment: Comment {
            id: row.get("id"),
            post_id: row.get("post_id"),
            author_id: row.get("author_id"),
            content: row.get("content"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        },
        author_username: row.get("author_username"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DbPool, SqlxCommentRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (1, 'hugh', 'h@example.com', 'x')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO posts (id, title, content, author_id) VALUES (1, 'Post', 'body', 1)")
            .execute(&pool)
            .await
            .unwrap();
        (pool.clone(), SqlxCommentRepository::new(pool))
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (_pool, repo) = setup().await;

        let first = repo
            .create(&Comment::new(1, 1, "First!".to_string()))
            .await
            .expect("Failed to create comment");
        repo.create(&Comment::new(1, 1, "Second".to_string()))
            .await
            .expect("Failed to create comment");

        assert_eq!(first.author_username, "hugh");
        let comments = repo.list_by_post(1).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].comment.content, "First!");
    }

    #[tokio::test]
    async fn test_update_content() {
        let (_pool, repo) = setup().await;
        let created = repo.create(&Comment::new(1, 1, "typo".to_string())).await.unwrap();

        let updated = repo
            .update_content(created.comment.id, "fixed")
            .await
            .unwrap()
            .expect("Comment should exist");

        assert_eq!(updated.comment.content, "fixed");
        assert!(repo.update_content(999, "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleting_post_removes_comments() {
        let (pool, repo) = setup().await;
        let created = repo.create(&Comment::new(1, 1, "bye".to_string())).await.unwrap();

        sqlx::query("DELETE FROM posts WHERE id = 1").execute(&pool).await.unwrap();

        assert!(repo.get_by_id(created.comment.id).await.unwrap().is_none());
    }
}
