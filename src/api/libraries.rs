//! Library API endpoints
//!
//! - GET /api/v1/libraries - All libraries
//! - GET /api/v1/libraries/{id} - Library with books and librarian
//! - POST /api/v1/libraries - Create
//! - POST /api/v1/libraries/{id}/books - Add a book
//! - DELETE /api/v1/libraries/{id}/books/{book_id} - Remove a book
//! - PUT /api/v1/libraries/{id}/librarian - Assign or replace the librarian
//!
//! Writes need `can_manage_library`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;

use crate::api::common::gated;
use crate::api::extract::Json;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Librarian, LibrarianInput, Library, LibraryDetail, LibraryInput, Permission};
use crate::services::{FieldErrors, Requirement};

#[derive(Debug, Deserialize)]
pub struct AddBookRequest {
    pub book_id: Option<i64>,
}

/// Build the libraries router
pub fn router() -> Router<AppState> {
    let manage = gated(
        Router::new()
            .route("/libraries", post(create_library))
            .route("/libraries/{id}/books", post(add_book))
            .route("/libraries/{id}/books/{book_id}", delete(remove_book))
            .route("/libraries/{id}/librarian", put(assign_librarian)),
        Requirement::Permission(Permission::ManageLibrary),
    );

    Router::new()
        .route("/libraries", get(list_libraries))
        .route("/libraries/{id}", get(get_library))
        .merge(manage)
}

async fn list_libraries(State(state): State<AppState>) -> Result<Json<Vec<Library>>, ApiError> {
    Ok(Json(state.library_service.list().await?))
}

async fn get_library(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LibraryDetail>, ApiError> {
    Ok(Json(state.library_service.get(id).await?))
}

async fn create_library(
    State(state): State<AppState>,
    Json(body): Json<LibraryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let library = state.library_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(library)))
}

/// POST /api/v1/libraries/{id}/books
async fn add_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<AddBookRequest>,
) -> Result<Json<LibraryDetail>, ApiError> {
    let book_id = body.book_id.ok_or_else(|| {
        ApiError::invalid_fields(&FieldErrors::single("book_id", "This field is required."))
    })?;
    Ok(Json(state.library_service.add_book(id, book_id).await?))
}

async fn remove_book(
    State(state): State<AppState>,
    Path((id, book_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state.library_service.remove_book(id, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/libraries/{id}/librarian
async fn assign_librarian(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<LibrarianInput>,
) -> Result<Json<Librarian>, ApiError> {
    Ok(Json(state.library_service.assign_librarian(id, body).await?))
}
