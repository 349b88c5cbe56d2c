//! Comment service
//!
//! Comments belong to a post and a user. Only the comment's author may edit
//! or delete it.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentInput, CommentWithAuthor};
use crate::services::access::Identity;
use crate::services::post::{ensure_owner, BlogServiceError};
use crate::services::validation::FieldErrors;
use anyhow::Context;
use std::sync::Arc;

pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(comment_repo: Arc<dyn CommentRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self {
            comment_repo,
            post_repo,
        }
    }

    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>, BlogServiceError> {
        self.require_post(post_id).await?;
        Ok(self.comment_repo.list_by_post(post_id).await?)
    }

    pub async fn create(
        &self,
        post_id: i64,
        author_id: i64,
        input: CommentInput,
    ) -> Result<CommentWithAuthor, BlogServiceError> {
        self.require_post(post_id).await?;
        let content = validate_content(&input)?;

        let comment = self
            .comment_repo
            .create(&Comment::new(post_id, author_id, content))
            .await
            .context("Failed to create comment")?;

        tracing::debug!(comment_id = comment.comment.id, post_id, "Created comment");
        Ok(comment)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: i64,
        input: CommentInput,
    ) -> Result<CommentWithAuthor, BlogServiceError> {
        let existing = self.require_comment(id).await?;
        ensure_owner(identity, existing.comment.author_id, "comment")?;
        let content = validate_content(&input)?;

        self.comment_repo
            .update_content(id, &content)
            .await
            .context("Failed to update comment")?
            .ok_or_else(|| comment_not_found(id))
    }

    pub async fn delete(&self, identity: &Identity, id: i64) -> Result<(), BlogServiceError> {
        let existing = self.require_comment(id).await?;
        ensure_owner(identity, existing.comment.author_id, "comment")?;

        self.comment_repo
            .delete(id)
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }

    async fn require_post(&self, post_id: i64) -> Result<(), BlogServiceError> {
        match self.post_repo.get_by_id(post_id).await? {
            Some(_) => Ok(()),
            None => Err(BlogServiceError::NotFound(format!("Post {} not found", post_id))),
        }
    }

    async fn require_comment(&self, id: i64) -> Result<CommentWithAuthor, BlogServiceError> {
        self.comment_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| comment_not_found(id))
    }
}

fn validate_content(input: &CommentInput) -> Result<String, BlogServiceError> {
    let content = input.content.trim().to_string();
    let mut errors = FieldErrors::new();
    errors.require("content", &content);
    errors.into_result().map_err(BlogServiceError::ValidationError)?;
    Ok(content)
}

fn comment_not_found(id: i64) -> BlogServiceError {
    BlogServiceError::NotFound(format!("Comment {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCommentRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Post, UserRole};

    async fn setup_test_service() -> (CommentService, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash) VALUES (1, 'writer', 'w@example.com', 'x'), (2, 'reader', 'r@example.com', 'x')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let post = post_repo
            .create(&Post::new("Post".into(), "Body".into(), 1), &[])
            .await
            .unwrap();
        (
            CommentService::new(SqlxCommentRepository::boxed(pool), post_repo),
            post.post.id,
        )
    }

    fn text(content: &str) -> CommentInput {
        CommentInput {
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (service, post_id) = setup_test_service().await;

        service.create(post_id, 2, text("Well said")).await.expect("Failed to comment");

        let comments = service.list_for_post(post_id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author_username, "reader");
    }

    #[tokio::test]
    async fn test_blank_comment_rejected() {
        let (service, post_id) = setup_test_service().await;

        let result = service.create(post_id, 2, text("   ")).await;

        assert!(matches!(result, Err(BlogServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_comment_on_missing_post() {
        let (service, _) = setup_test_service().await;

        let result = service.create(404, 2, text("Hello?")).await;

        assert!(matches!(result, Err(BlogServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_only_author_edits_and_deletes() {
        let (service, post_id) = setup_test_service().await;
        let comment = service.create(post_id, 2, text("First")).await.unwrap();
        let id = comment.comment.id;
        let post_owner = Identity::user(1, UserRole::Admin);
        let author = Identity::user(2, UserRole::Member);

        assert!(matches!(
            service.update(&post_owner, id, text("Hijacked")).await,
            Err(BlogServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(&post_owner, id).await,
            Err(BlogServiceError::Forbidden(_))
        ));

        let updated = service.update(&author, id, text("Edited")).await.unwrap();
        assert_eq!(updated.comment.content, "Edited");
        service.delete(&author, id).await.expect("Author delete failed");
        assert!(service.list_for_post(post_id).await.unwrap().is_empty());
    }
}
