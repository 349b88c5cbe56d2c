//! Blog post API endpoints
//!
//! - GET /api/v1/posts - Newest first, `q` and `tag_name` filters
//! - GET /api/v1/posts/{id} - Post with tags and comments
//! - POST /api/v1/posts - Create (authenticated)
//! - PUT/DELETE /api/v1/posts/{id} - Author only
//! - GET /api/v1/posts/{id}/comments - Comments on a post
//! - POST /api/v1/posts/{id}/comments - Comment (authenticated)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use crate::api::common::{gated, PaginationQuery};
use crate::api::extract::{Json, Query};
use crate::api::middleware::{ApiError, AppState, CurrentUser};
use crate::models::{
    CommentInput, CommentWithAuthor, CreatePostInput, PagedResult, PostDetail,
    PostFilter, PostWithMeta, UpdatePostInput,
};
use crate::services::Requirement;

/// Query parameters for the post list
#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    pub q: Option<String>,
    pub tag_name: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Build the posts router
pub fn router() -> Router<AppState> {
    let authenticated = gated(
        Router::new()
            .route("/posts", post(create_post))
            .route("/posts/{id}", put(update_post).delete(delete_post))
            .route("/posts/{id}/comments", post(create_comment)),
        Requirement::Authenticated,
    );

    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/{id}", get(get_post))
        .route("/posts/{id}/comments", get(list_comments))
        .merge(authenticated)
}

/// GET /api/v1/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PagedResult<PostWithMeta>>, ApiError> {
    let filter = PostFilter {
        q: query.q,
        tag_name: query.tag_name,
    };
    let params = PaginationQuery {
        page: query.page,
        page_size: query.page_size,
    }
    .params();

    Ok(Json(state.post_service.list(&filter, &params).await?))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostDetail>, ApiError> {
    Ok(Json(state.post_service.get_detail(id).await?))
}

/// POST /api/v1/posts
async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.post_service.create(user.id(), body).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<PostWithMeta>, ApiError> {
    Ok(Json(
        state.post_service.update(&user.identity(), id, body).await?,
    ))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(&user.identity(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/posts/{id}/comments
async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CommentWithAuthor>>, ApiError> {
    Ok(Json(state.comment_service.list_for_post(id).await?))
}

/// POST /api/v1/posts/{id}/comments
async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<CommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.comment_service.create(id, user.id(), body).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
