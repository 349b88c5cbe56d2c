//! Book repository
//!
//! Database operations for books, including the filtered and ordered list
//! used by the catalog endpoints.

use super::search_key;
use crate::db::DbPool;
use crate::models::{AuthorFilter, Book, BookFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

/// Fields written on create and update
#[derive(Debug, Clone)]
pub struct BookRecord {
    pub title: String,
    pub publication_year: i32,
    pub author_id: i64,
    pub description: String,
}

/// Book repository trait
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn create(&self, book: &BookRecord) -> Result<Book>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Book>>;

    /// Filtered, ordered page of books plus the total match count
    async fn list(&self, filter: &BookFilter) -> Result<(Vec<Book>, i64)>;

    /// Replace all fields; returns None when the book does not exist
    async fn update(&self, id: i64, book: &BookRecord) -> Result<Option<Book>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based book repository implementation
pub struct SqlxBookRepository {
    pool: DbPool,
}

impl SqlxBookRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn BookRepository> {
        Arc::new(Self::new(pool))
    }
}

pub(crate) const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.publication_year, b.author_id, b.description, a.name AS author_name
    FROM books b
    JOIN authors a ON a.id = b.author_id
"#;

#[async_trait]
impl BookRepository for SqlxBookRepository {
    async fn create(&self, book: &BookRecord) -> Result<Book> {
        let result = sqlx::query(
            r#"
            INSERT INTO books (title, title_key, publication_year, author_id, description)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&book.title)
        .bind(search_key(&book.title))
        .bind(book.publication_year)
        .bind(book.author_id)
        .bind(&book.description)
        .execute(&self.pool)
        .await
        .context("Failed to create book")?;

        get_book_by_id(&self.pool, result.last_insert_rowid())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Book not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Book>> {
        get_book_by_id(&self.pool, id).await
    }

    async fn list(&self, filter: &BookFilter) -> Result<(Vec<Book>, i64)> {
        let mut count_query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) as count FROM books b JOIN authors a ON a.id = b.author_id",
        );
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build()
            .fetch_one(&self.pool)
            .await
            .context("Failed to count books")?
            .get("count");

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(BOOK_SELECT);
        push_filters(&mut query, filter);
        query.push(" ORDER BY ");
        query.push(filter.ordering.to_sql());
        query.push(" LIMIT ");
        query.push_bind(filter.params.limit());
        query.push(" OFFSET ");
        query.push_bind(filter.params.offset());

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list books")?;

        Ok((rows.iter().map(row_to_book).collect(), total))
    }

    async fn update(&self, id: i64, book: &BookRecord) -> Result<Option<Book>> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = ?, title_key = ?, publication_year = ?, author_id = ?, description = ?
            WHERE id = ?
            "#,
        )
        .bind(&book.title)
        .bind(search_key(&book.title))
        .bind(book.publication_year)
        .bind(book.author_id)
        .bind(&book.description)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update book")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        get_book_by_id(&self.pool, id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete book")?;

        Ok(result.rows_affected() > 0)
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &BookFilter) {
    query.push(" WHERE 1 = 1");

    match &filter.author {
        Some(AuthorFilter::Id(id)) => {
            query.push(" AND b.author_id = ");
            query.push_bind(*id);
        }
        Some(AuthorFilter::Name(name)) => {
            query.push(" AND a.name = ");
            query.push_bind(name.clone());
        }
        None => {}
    }
    if let Some(title) = &filter.title {
        query.push(" AND b.title = ");
        query.push_bind(title.clone());
    }
    if let Some(year) = filter.publication_year {
        query.push(" AND b.publication_year = ");
        query.push_bind(year);
    }
    if let Some(search) = &filter.search {
        let needle = search_key(search);
        query.push(" AND (instr(b.title_key, ");
        query.push_bind(needle.clone());
        query.push(") > 0 OR instr(a.name_key, ");
        query.push_bind(needle);
        query.push(") > 0)");
    }
}

async fn get_book_by_id(pool: &DbPool, id: i64) -> Result<Option<Book>> {
    let sql = format!("{} WHERE b.id = ?", BOOK_SELECT);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get book by ID")?;

    Ok(row.as_ref().map(row_to_book))
}

pub(crate) fn row_to_book(row: &SqliteRow) -> Book {
    Book {
        id: row.get("id"),
        title: row.get("title"),
        publication_year: row.get("publication_year"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        description: row.get("description"),
    }
}
