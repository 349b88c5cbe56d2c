//! Post service
//!
//! Blog posts with tags. Any authenticated user may write a post; only its
//! author may edit or delete it.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{
    CreatePostInput, ListParams, PagedResult, PostDetail, PostFilter, PostWithMeta,
    UpdatePostInput, Post,
};
use crate::services::access::{is_owner, Identity};
use crate::services::validation::FieldErrors;
use anyhow::Context;
use std::sync::Arc;

/// Error type shared by the post, tag and comment services
#[derive(Debug, thiserror::Error)]
pub enum BlogServiceError {
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller does not own the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
}

impl PostService {
    pub fn new(post_repo: Arc<dyn PostRepository>, comment_repo: Arc<dyn CommentRepository>) -> Self {
        Self {
            post_repo,
            comment_repo,
        }
    }

    /// Newest posts first
    pub async fn list(
        &self,
        filter: &PostFilter,
        params: &ListParams,
    ) -> Result<PagedResult<PostWithMeta>, BlogServiceError> {
        let filter = PostFilter {
            q: non_blank(filter.q.as_deref()),
            tag_name: non_blank(filter.tag_name.as_deref()),
        };
        let (posts, total) = self
            .post_repo
            .list(&filter, params)
            .await
            .context("Failed to list posts")?;
        Ok(PagedResult::new(posts, total, params))
    }

    /// Post with tags and comments
    pub async fn get_detail(&self, id: i64) -> Result<PostDetail, BlogServiceError> {
        let post = self.require_post(id).await?;
        let comments = self.comment_repo.list_by_post(id).await?;
        Ok(PostDetail { post, comments })
    }

    /// Create a post owned by `author_id`
    pub async fn create(
        &self,
        author_id: i64,
        input: CreatePostInput,
    ) -> Result<PostWithMeta, BlogServiceError> {
        let title = input.title.trim().to_string();
        let mut errors = FieldErrors::new();
        errors.require("title", &title);
        errors.require("content", &input.content);
        errors.into_result().map_err(BlogServiceError::ValidationError)?;

        let post = Post::new(title, input.content, author_id);
        let created = self
            .post_repo
            .create(&post, &input.tags)
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = created.post.id, author_id, "Created post");
        Ok(created)
    }

    /// Update a post; the caller must be its author
    pub async fn update(
        &self,
        identity: &Identity,
        id: i64,
        input: UpdatePostInput,
    ) -> Result<PostWithMeta, BlogServiceError> {
        let existing = self.require_post(id).await?;
        ensure_owner(identity, existing.post.author_id, "post")?;

        let mut errors = FieldErrors::new();
        if let Some(title) = &input.title {
            errors.require("title", title);
        }
        if let Some(content) = &input.content {
            errors.require("content", content);
        }
        errors.into_result().map_err(BlogServiceError::ValidationError)?;

        let mut post = existing.post;
        if let Some(title) = input.title {
            post.title = title.trim().to_string();
        }
        if let Some(content) = input.content {
            post.content = content;
        }

        Ok(self
            .post_repo
            .update(&post, input.tags.as_deref())
            .await
            .context("Failed to update post")?)
    }

    /// Delete a post and its comments; the caller must be its author
    pub async fn delete(&self, identity: &Identity, id: i64) -> Result<(), BlogServiceError> {
        let existing = self.require_post(id).await?;
        ensure_owner(identity, existing.post.author_id, "post")?;

        self.post_repo.delete(id).await.context("Failed to delete post")?;
        tracing::info!(post_id = id, "Deleted post");
        Ok(())
    }

    pub(crate) async fn require_post(&self, id: i64) -> Result<PostWithMeta, BlogServiceError> {
        self.post_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| BlogServiceError::NotFound(format!("Post {} not found", id)))
    }
}

pub(crate) fn ensure_owner(identity: &Identity, owner_id: i64, what: &str) -> Result<(), BlogServiceError> {
    if is_owner(identity, owner_id) {
        Ok(())
    } else {
        Err(BlogServiceError::Forbidden(format!(
            "Only the author can modify this {}",
            what
        )))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
