//! Tag service

use crate::db::repositories::{PostRepository, TagRepository};
use crate::models::{ListParams, PagedResult, PostFilter, PostWithMeta, Tag};
use crate::services::post::BlogServiceError;
use anyhow::Context;
use std::sync::Arc;

pub struct TagService {
    tag_repo: Arc<dyn TagRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl TagService {
    pub fn new(tag_repo: Arc<dyn TagRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self { tag_repo, post_repo }
    }

    pub async fn list(&self) -> Result<Vec<Tag>, BlogServiceError> {
        Ok(self.tag_repo.list().await.context("Failed to list tags")?)
    }

    /// Posts carrying the named tag, newest first. Unknown tags are 404.
    pub async fn posts_for_tag(
        &self,
        name: &str,
        params: &ListParams,
    ) -> Result<(Tag, PagedResult<PostWithMeta>), BlogServiceError> {
        let tag = self
            .tag_repo
            .get_by_name(name)
            .await?
            .ok_or_else(|| BlogServiceError::NotFound(format!("Tag '{}' not found", name.trim())))?;

        let filter = PostFilter {
            q: None,
            tag_name: Some(tag.name.clone()),
        };
        let (posts, total) = self
            .post_repo
            .list(&filter, params)
            .await
            .context("Failed to list posts for tag")?;

        Ok((tag, PagedResult::new(posts, total, params)))
    }
}
