//! Author repository
//!
//! Database operations for authors. Deleting an author cascades to its books
//! through the foreign key.

use super::search_key;
use crate::db::DbPool;
use crate::models::{Author, AuthorWithBooks, BookSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;

/// Author repository trait
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Author>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>>;

    /// All authors ordered by name, each with its books
    async fn list_with_books(&self) -> Result<Vec<AuthorWithBooks>>;

    /// Books of a single author ordered by title
    async fn list_books(&self, author_id: i64) -> Result<Vec<BookSummary>>;

    /// Rename an author; returns None when it does not exist
    async fn update(&self, id: i64, name: &str) -> Result<Option<Author>>;

    /// Delete an author and its books; returns false when nothing was deleted
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based author repository implementation
pub struct SqlxAuthorRepository {
    pool: DbPool,
}

impl SqlxAuthorRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn AuthorRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuthorRepository for SqlxAuthorRepository {
    async fn create(&self, name: &str) -> Result<Author> {
        let result = sqlx::query("INSERT INTO authors (name, name_key) VALUES (?, ?)")
            .bind(name)
            .bind(search_key(name))
            .execute(&self.pool)
            .await
            .context("Failed to create author")?;

        Ok(Author {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>> {
        let row = sqlx::query("SELECT id, name FROM authors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get author by ID")?;

        Ok(row.as_ref().map(row_to_author))
    }

    async fn list_with_books(&self) -> Result<Vec<AuthorWithBooks>> {
        let authors = sqlx::query("SELECT id, name FROM authors ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list authors")?;

        let books = sqlx::query(
            "SELECT id, title, publication_year, author_id FROM books ORDER BY title, id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list books for authors")?;

        let mut by_author: HashMap<i64, Vec<BookSummary>> = HashMap::new();
        for row in &books {
            by_author
                .entry(row.get("author_id"))
                .or_default()
                .push(row_to_summary(row));
        }

        Ok(authors
            .iter()
            .map(|row| {
                let author = row_to_author(row);
                let books = by_author.remove(&author.id).unwrap_or_default();
                AuthorWithBooks::new(author, books)
            })
            .collect())
    }

    async fn list_books(&self, author_id: i64) -> Result<Vec<BookSummary>> {
        let rows = sqlx::query(
            "SELECT id, title, publication_year FROM books WHERE author_id = ? ORDER BY title, id",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list books of author")?;

        Ok(rows.iter().map(row_to_summary).collect())
    }

    async fn update(&self, id: i64, name: &str) -> Result<Option<Author>> {
        let result = sqlx::query("UPDATE authors SET name = ?, name_key = ? WHERE id = ?")
            .bind(name)
            .bind(search_key(name))
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update author")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(Author {
            id,
            name: name.to_string(),
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete author")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_author(row: &SqliteRow) -> Author {
    Author {
        id: row.get("id"),
        name: row.get("name"),
    }
}

fn row_to_summary(row: &SqliteRow) -> BookSummary {
    BookSummary {
        id: row.get("id"),
        title: row.get("title"),
        publication_year: row.get("publication_year"),
    }
}
