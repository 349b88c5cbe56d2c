//! Author API endpoints
//!
//! - GET /api/v1/authors - Authors with their books
//! - GET /api/v1/authors/{id} - Author detail
//! - POST /api/v1/authors - Create (`can_add_author`)
//! - PUT /api/v1/authors/{id} - Rename (`can_change_author`)
//! - DELETE /api/v1/authors/{id} - Delete with books (`can_delete_author`)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};

use crate::api::common::gated;
use crate::api::extract::Json;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Author, AuthorInput, AuthorWithBooks, Permission};
use crate::services::Requirement;

/// Build the authors router
pub fn router() -> Router<AppState> {
    let create = gated(
        Router::new().route("/authors", post(create_author)),
        Requirement::Permission(Permission::AddAuthor),
    );
    let change = gated(
        Router::new().route("/authors/{id}", put(update_author)),
        Requirement::Permission(Permission::ChangeAuthor),
    );
    let remove = gated(
        Router::new().route("/authors/{id}", delete(delete_author)),
        Requirement::Permission(Permission::DeleteAuthor),
    );

    Router::new()
        .route("/authors", get(list_authors))
        .route("/authors/{id}", get(get_author))
        .merge(create)
        .merge(change)
        .merge(remove)
}

async fn list_authors(State(state): State<AppState>) -> Result<Json<Vec<AuthorWithBooks>>, ApiError> {
    Ok(Json(state.catalog_service.list_authors().await?))
}

async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AuthorWithBooks>, ApiError> {
    Ok(Json(state.catalog_service.get_author(id).await?))
}

async fn create_author(
    State(state): State<AppState>,
    Json(body): Json<AuthorInput>,
) -> Result<impl IntoResponse, ApiError> {
    let author = state.catalog_service.create_author(body).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<AuthorInput>,
) -> Result<Json<Author>, ApiError> {
    Ok(Json(state.catalog_service.update_author(id, body).await?))
}

async fn delete_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog_service.delete_author(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
