//! Library service
//!
//! Libraries, their holdings and their librarian.

use crate::db::repositories::{BookRepository, LibraryRepository};
use crate::models::{Librarian, LibrarianInput, Library, LibraryDetail, LibraryInput};
use crate::services::validation::FieldErrors;
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LibraryServiceError {
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct LibraryService {
    library_repo: Arc<dyn LibraryRepository>,
    book_repo: Arc<dyn BookRepository>,
}

impl LibraryService {
    pub fn new(library_repo: Arc<dyn LibraryRepository>, book_repo: Arc<dyn BookRepository>) -> Self {
        Self {
            library_repo,
            book_repo,
        }
    }

    pub async fn list(&self) -> Result<Vec<Library>, LibraryServiceError> {
        Ok(self.library_repo.list().await?)
    }

    /// Library with its books and librarian
    pub async fn get(&self, id: i64) -> Result<LibraryDetail, LibraryServiceError> {
        let library = self.require_library(id).await?;
        let books = self.library_repo.list_books(id).await?;
        let librarian = self.library_repo.get_librarian(id).await?;

        Ok(LibraryDetail {
            id: library.id,
            name: library.name,
            books,
            librarian,
        })
    }

    pub async fn create(&self, input: LibraryInput) -> Result<Library, LibraryServiceError> {
        let name = require_name(&input.name)?;
        let library = self
            .library_repo
            .create(&name)
            .await
            .context("Failed to create library")?;

        tracing::info!(library_id = library.id, "Created library {}", library.name);
        Ok(library)
    }

    pub async fn add_book(&self, library_id: i64, book_id: i64) -> Result<LibraryDetail, LibraryServiceError> {
        self.require_library(library_id).await?;
        if self.book_repo.get_by_id(book_id).await?.is_none() {
            return Err(LibraryServiceError::ValidationError(FieldErrors::single(
                "book_id",
                format!("Invalid pk \"{}\" - object does not exist.", book_id),
            )));
        }

        self.library_repo
            .add_book(library_id, book_id)
            .await
            .context("Failed to add book to library")?;
        self.get(library_id).await
    }

    pub async fn remove_book(&self, library_id: i64, book_id: i64) -> Result<(), LibraryServiceError> {
        self.require_library(library_id).await?;
        let removed = self
            .library_repo
            .remove_book(library_id, book_id)
            .await
            .context("Failed to remove book from library")?;
        if !removed {
            return Err(LibraryServiceError::NotFound(format!(
                "Book {} is not held by library {}",
                book_id, library_id
            )));
        }
        Ok(())
    }

    /// Assign the library's librarian, replacing any existing one
    pub async fn assign_librarian(
        &self,
        library_id: i64,
        input: LibrarianInput,
    ) -> Result<Librarian, LibraryServiceError> {
        self.require_library(library_id).await?;
        let name = require_name(&input.name)?;

        Ok(self
            .library_repo
            .upsert_librarian(library_id, &name)
            .await
            .context("Failed to assign librarian")?)
    }

    async fn require_library(&self, id: i64) -> Result<Library, LibraryServiceError> {
        self.library_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| LibraryServiceError::NotFound(format!("Library {} not found", id)))
    }
}

fn require_name(raw: &str) -> Result<String, LibraryServiceError> {
    let name = raw.trim().to_string();
    let mut errors = FieldErrors::new();
    errors.require("name", &name);
    errors.into_result().map_err(LibraryServiceError::ValidationError)?;
    Ok(name)
}
