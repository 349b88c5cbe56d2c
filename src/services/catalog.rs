//! Catalog service
//!
//! Authors and books. Book input is validated field by field: the title must
//! not be blank, the publication year may not lie in the future, the author
//! must exist and the description may not embed a `<script` tag.

use crate::db::repositories::{AuthorRepository, BookRecord, BookRepository};
use crate::models::{
    Author, AuthorInput, AuthorWithBooks, Book, BookFilter, BookInput, PagedResult,
};
use crate::services::validation::{
    check_publication_year, contains_script_tag, current_year, FieldErrors, REQUIRED_MESSAGE,
};
use anyhow::Context;
use std::sync::Arc;

/// Error types for catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogServiceError {
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CatalogService {
    author_repo: Arc<dyn AuthorRepository>,
    book_repo: Arc<dyn BookRepository>,
}

impl CatalogService {
    pub fn new(author_repo: Arc<dyn AuthorRepository>, book_repo: Arc<dyn BookRepository>) -> Self {
        Self {
            author_repo,
            book_repo,
        }
    }

    // ------------------------------------------------------------------
    // Authors
    // ------------------------------------------------------------------

    pub async fn list_authors(&self) -> Result<Vec<AuthorWithBooks>, CatalogServiceError> {
        Ok(self.author_repo.list_with_books().await?)
    }

    pub async fn get_author(&self, id: i64) -> Result<AuthorWithBooks, CatalogServiceError> {
        let author = self.require_author(id).await?;
        let books = self.author_repo.list_books(id).await?;
        Ok(AuthorWithBooks::new(author, books))
    }

    pub async fn create_author(&self, input: AuthorInput) -> Result<Author, CatalogServiceError> {
        let name = validate_author(&input)?;
        let author = self
            .author_repo
            .create(&name)
            .await
            .context("Failed to create author")?;

        tracing::info!(author_id = author.id, "Created author {}", author.name);
        Ok(author)
    }

    pub async fn update_author(&self, id: i64, input: AuthorInput) -> Result<Author, CatalogServiceError> {
        let name = validate_author(&input)?;
        self.author_repo
            .update(id, &name)
            .await
            .context("Failed to update author")?
            .ok_or_else(|| author_not_found(id))
    }

    /// Delete an author together with all of its books
    pub async fn delete_author(&self, id: i64) -> Result<(), CatalogServiceError> {
        if !self.author_repo.delete(id).await.context("Failed to delete author")? {
            return Err(author_not_found(id));
        }
        tracing::info!(author_id = id, "Deleted author and their books");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Books
    // ------------------------------------------------------------------

    pub async fn list_books(&self, filter: &BookFilter) -> Result<PagedResult<Book>, CatalogServiceError> {
        let (books, total) = self.book_repo.list(filter).await.context("Failed to list books")?;
        Ok(PagedResult::new(books, total, &filter.params))
    }

    pub async fn get_book(&self, id: i64) -> Result<Book, CatalogServiceError> {
        self.book_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| book_not_found(id))
    }

    pub async fn create_book(&self, input: BookInput) -> Result<Book, CatalogServiceError> {
        let record = self.validate_book(input).await?;
        let book = self
            .book_repo
            .create(&record)
            .await
            .context("Failed to create book")?;

        tracing::info!(book_id = book.id, author_id = book.author_id, "Created book {}", book.title);
        Ok(book)
    }

    pub async fn update_book(&self, id: i64, input: BookInput) -> Result<Book, CatalogServiceError> {
        // 404 takes precedence over validation errors
        self.get_book(id).await?;
        let record = self.validate_book(input).await?;
        self.book_repo
            .update(id, &record)
            .await
            .context("Failed to update book")?
            .ok_or_else(|| book_not_found(id))
    }

    pub async fn delete_book(&self, id: i64) -> Result<(), CatalogServiceError> {
        if !self.book_repo.delete(id).await.context("Failed to delete book")? {
            return Err(book_not_found(id));
        }
        tracing::info!(book_id = id, "Deleted book");
        Ok(())
    }

    async fn require_author(&self, id: i64) -> Result<Author, CatalogServiceError> {
        self.author_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| author_not_found(id))
    }

    async fn validate_book(&self, input: BookInput) -> Result<BookRecord, CatalogServiceError> {
        let mut errors = FieldErrors::new();
        let title = input.title.trim().to_string();
        errors.require("title", &title);

        match input.publication_year {
            Some(year) => check_publication_year(&mut errors, year, current_year()),
            None => errors.add("publication_year", REQUIRED_MESSAGE),
        }

        match input.author_id {
            Some(author_id) => {
                if self.author_repo.get_by_id(author_id).await?.is_none() {
                    errors.add(
                        "author",
                        format!("Invalid pk \"{}\" - object does not exist.", author_id),
                    );
                }
            }
            None => errors.add("author", REQUIRED_MESSAGE),
        }

        if contains_script_tag(&input.description) {
            errors.add("description", "Script tags are not allowed.");
        }

        errors.into_result().map_err(CatalogServiceError::ValidationError)?;

        Ok(BookRecord {
            title,
            publication_year: input.publication_year.unwrap_or_default(),
            author_id: input.author_id.unwrap_or_default(),
            description: input.description,
        })
    }
}

fn validate_author(input: &AuthorInput) -> Result<String, CatalogServiceError> {
    let name = input.name.trim().to_string();
    let mut errors = FieldErrors::new();
    errors.require("name", &name);
    errors.into_result().map_err(CatalogServiceError::ValidationError)?;
    Ok(name)
}

fn author_not_found(id: i64) -> CatalogServiceError {
    CatalogServiceError::NotFound(format!("Author {} not found", id))
}

fn book_not_found(id: i64) -> CatalogServiceError {
    CatalogServiceError::NotFound(format!("Book {} not found", id))
}
