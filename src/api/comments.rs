//! Comment API endpoints
//!
//! - PUT /api/v1/comments/{id} - Edit (comment author only)
//! - DELETE /api/v1/comments/{id} - Delete (comment author only)
//!
//! Listing and creating live under `/posts/{id}/comments`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::put,
    Router,
};

use crate::api::common::gated;
use crate::api::extract::Json;
use crate::api::middleware::{ApiError, AppState, CurrentUser};
use crate::models::{CommentInput, CommentWithAuthor};
use crate::services::Requirement;

/// Build the comments router
pub fn router() -> Router<AppState> {
    gated(
        Router::new().route("/comments/{id}", put(update_comment).delete(delete_comment)),
        Requirement::Authenticated,
    )
}

async fn update_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<CommentInput>,
) -> Result<Json<CommentWithAuthor>, ApiError> {
    Ok(Json(
        state.comment_service.update(&user.identity(), id, body).await?,
    ))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(&user.identity(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
