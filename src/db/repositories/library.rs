//! Library repository
//!
//! Libraries hold books through the `library_books` join table and have at
//! most one librarian.

use super::book::{row_to_book, BOOK_SELECT};
use crate::db::DbPool;
use crate::models::{Book, Librarian, Library};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;

/// Library repository trait
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Library>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Library>>;

    async fn list(&self) -> Result<Vec<Library>>;

    /// Books held by a library ordered by title
    async fn list_books(&self, library_id: i64) -> Result<Vec<Book>>;

    /// Link a book; linking twice is a no-op
    async fn add_book(&self, library_id: i64, book_id: i64) -> Result<()>;

    /// Unlink a book; returns false when it was not linked
    async fn remove_book(&self, library_id: i64, book_id: i64) -> Result<bool>;

    async fn get_librarian(&self, library_id: i64) -> Result<Option<Librarian>>;

    /// Assign the librarian, replacing the name of an existing one
    async fn upsert_librarian(&self, library_id: i64, name: &str) -> Result<Librarian>;
}

/// SQLx-based library repository implementation
pub struct SqlxLibraryRepository {
    pool: DbPool,
}

impl SqlxLibraryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn LibraryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LibraryRepository for SqlxLibraryRepository {
    async fn create(&self, name: &str) -> Result<Library> {
        let result = sqlx::query("INSERT INTO libraries (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .context("Failed to create library")?;

        Ok(Library {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Library>> {
        let row = sqlx::query("SELECT id, name FROM libraries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get library by ID")?;

        Ok(row.as_ref().map(row_to_library))
    }

    async fn list(&self) -> Result<Vec<Library>> {
        let rows = sqlx::query("SELECT id, name FROM libraries ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list libraries")?;

        Ok(rows.iter().map(row_to_library).collect())
    }

    async fn list_books(&self, library_id: i64) -> Result<Vec<Book>> {
        let sql = format!(
            "{} JOIN library_books lb ON lb.book_id = b.id WHERE lb.library_id = ? ORDER BY b.title, b.id",
            BOOK_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(library_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list library books")?;

        Ok(rows.iter().map(row_to_book).collect())
    }

    async fn add_book(&self, library_id: i64, book_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO library_books (library_id, book_id) VALUES (?, ?)")
            .bind(library_id)
            .bind(book_id)
            .execute(&self.pool)
            .await
            .context("Failed to add book to library")?;

        Ok(())
    }

    async fn remove_book(&self, library_id: i64, book_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM library_books WHERE library_id = ? AND book_id = ?")
            .bind(library_id)
            .bind(book_id)
            .execute(&self.pool)
            .await
            .context("Failed to remove book from library")?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_librarian(&self, library_id: i64) -> Result<Option<Librarian>> {
        let row = sqlx::query("SELECT id, name, library_id FROM librarians WHERE library_id = ?")
            .bind(library_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get librarian")?;

        Ok(row.as_ref().map(row_to_librarian))
    }

    async fn upsert_librarian(&self, library_id: i64, name: &str) -> Result<Librarian> {
        sqlx::query(
            r#"
            INSERT INTO librarians (name, library_id) VALUES (?, ?)
            ON CONFLICT(library_id) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(name)
        .bind(library_id)
        .execute(&self.pool)
        .await
        .context("Failed to assign librarian")?;

        self.get_librarian(library_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Librarian not found after upsert"))
    }
}

fn row_to_library(row: &SqliteRow) -> Library {
    Library {
        id: row.get("id"),
        name: row.get("name"),
    }
}

fn row_to_librarian(row: &SqliteRow) -> Librarian {
    Librarian {
        id: row.get("id"),
        name: row.get("name"),
        library_id: row.get("library_id"),
    }
}
