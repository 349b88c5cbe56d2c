//! Tag API endpoints
//!
//! Handles HTTP requests for tags:
//! - GET /api/v1/tags - All tags
//! - GET /api/v1/tags/{name}/posts - Posts with tag, newest first

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use serde::Serialize;

use crate::api::common::PaginationQuery;
use crate::api::extract::{Json, Query};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{PagedResult, PostWithMeta, Tag};

/// Response for the posts of a tag
#[derive(Debug, Serialize)]
pub struct TagPostsResponse {
    pub tag: Tag,
    pub posts: PagedResult<PostWithMeta>,
}

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags))
        .route("/tags/{name}/posts", get(posts_for_tag))
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tag_service.list().await?))
}

/// GET /api/v1/tags/{name}/posts
async fn posts_for_tag(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<TagPostsResponse>, ApiError> {
    let (tag, posts) = state
        .tag_service
        .posts_for_tag(&name, &query.params())
        .await?;
    Ok(Json(TagPostsResponse { tag, posts }))
}
