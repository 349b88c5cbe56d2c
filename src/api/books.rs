//! Book API endpoints
//!
//! - GET /api/v1/books - Filtered, searchable, ordered and paginated list
//! - GET /api/v1/books/{id} - Book detail
//! - POST /api/v1/books - Create (`can_add_book`)
//! - PUT /api/v1/books/{id} - Replace (`can_change_book`)
//! - DELETE /api/v1/books/{id} - Delete (`can_delete_book`, admins only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;

use crate::api::common::gated;
use crate::api::extract::{Json, Query};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    AuthorFilter, Book, BookFilter, BookInput, BookOrdering, ListParams, PagedResult, Permission,
};
use crate::services::Requirement;

/// Query parameters for the book list
#[derive(Debug, Default, Deserialize)]
pub struct ListBooksQuery {
    /// Author id or exact author name
    pub author: Option<String>,
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListBooksQuery {
    pub fn into_filter(self) -> BookFilter {
        BookFilter {
            author: self.author.as_deref().and_then(AuthorFilter::parse),
            title: self.title.filter(|t| !t.is_empty()),
            publication_year: self.publication_year,
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            ordering: self
                .ordering
                .as_deref()
                .map(BookOrdering::parse)
                .unwrap_or_default(),
            params: ListParams::from_query(self.page, self.page_size),
        }
    }
}

/// Build the books router
pub fn router() -> Router<AppState> {
    let create = gated(
        Router::new().route("/books", post(create_book)),
        Requirement::Permission(Permission::AddBook),
    );
    let change = gated(
        Router::new().route("/books/{id}", put(update_book)),
        Requirement::Permission(Permission::ChangeBook),
    );
    let remove = gated(
        Router::new().route("/books/{id}", delete(delete_book)),
        Requirement::Permission(Permission::DeleteBook),
    );

    Router::new()
        .route("/books", get(list_books))
        .route("/books/{id}", get(get_book))
        .merge(create)
        .merge(change)
        .merge(remove)
}

/// GET /api/v1/books
async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<PagedResult<Book>>, ApiError> {
    let filter = query.into_filter();
    Ok(Json(state.catalog_service.list_books(&filter).await?))
}

async fn get_book(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.catalog_service.get_book(id).await?))
}

/// POST /api/v1/books
async fn create_book(
    State(state): State<AppState>,
    Json(body): Json<BookInput>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state.catalog_service.create_book(body).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<BookInput>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.catalog_service.update_book(id, body).await?))
}

async fn delete_book(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.catalog_service.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
