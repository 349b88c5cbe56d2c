//! Book model and catalog query parameters

use serde::{Deserialize, Serialize};

use super::pagination::ListParams;

/// Book entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub publication_year: i32,
    /// Owning author (foreign key)
    pub author_id: i64,
    /// Denormalized from the author row for display
    pub author_name: String,
    pub description: String,
}

/// Book fields nested inside an author payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub publication_year: i32,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            publication_year: book.publication_year,
        }
    }
}

/// Input for creating or replacing a book
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookInput {
    #[serde(default)]
    pub title: String,
    pub publication_year: Option<i32>,
    #[serde(alias = "author")]
    pub author_id: Option<i64>,
    #[serde(default)]
    pub description: String,
}

/// How the `author` list filter matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorFilter {
    Id(i64),
    /// Exact author name
    Name(String),
}

impl AuthorFilter {
    /// Integers select by author id, anything else by exact name
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match raw.parse::<i64>() {
            Ok(id) => AuthorFilter::Id(id),
            Err(_) => AuthorFilter::Name(raw.to_string()),
        })
    }
}

/// Sortable book columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookOrderField {
    Title,
    PublicationYear,
    Id,
}

impl BookOrderField {
    fn column(&self) -> &'static str {
        match self {
            BookOrderField::Title => "b.title",
            BookOrderField::PublicationYear => "b.publication_year",
            BookOrderField::Id => "b.id",
        }
    }
}

/// Ordering requested through `?ordering=`; `-` prefix means descending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookOrdering {
    pub field: BookOrderField,
    pub descending: bool,
}

impl Default for BookOrdering {
    fn default() -> Self {
        Self {
            field: BookOrderField::Title,
            descending: false,
        }
    }
}

impl BookOrdering {
    /// Parse an ordering expression. Unknown fields fall back to the default.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "title" => BookOrderField::Title,
            "publication_year" => BookOrderField::PublicationYear,
            "id" => BookOrderField::Id,
            _ => return Self::default(),
        };
        Self { field, descending }
    }

    /// ORDER BY clause body. Built only from whitelisted columns; `b.id` breaks ties.
    pub fn to_sql(&self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        if self.field == BookOrderField::Id {
            format!("b.id {}", direction)
        } else {
            format!("{} {}, b.id ASC", self.field.column(), direction)
        }
    }
}

/// Filters accepted by the book list
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub author: Option<AuthorFilter>,
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    /// Case-insensitive substring over title and author name
    pub search: Option<String>,
    pub ordering: BookOrdering,
    pub params: ListParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_filter_parse() {
        assert_eq!(AuthorFilter::parse("12"), Some(AuthorFilter::Id(12)));
        assert_eq!(
            AuthorFilter::parse("Ellis Peters"),
            Some(AuthorFilter::Name("Ellis Peters".to_string()))
        );
        assert_eq!(AuthorFilter::parse("  "), None);
    }

    #[test]
    fn test_ordering_parse() {
        assert_eq!(BookOrdering::parse("title"), BookOrdering::default());
        assert_eq!(
            BookOrdering::parse("-publication_year"),
            BookOrdering {
                field: BookOrderField::PublicationYear,
                descending: true
            }
        );
        assert_eq!(BookOrdering::parse("id").field, BookOrderField::Id);
    }

    #[test]
    fn test_unknown_ordering_falls_back_to_default() {
        assert_eq!(BookOrdering::parse("price"), BookOrdering::default());
        assert_eq!(
            BookOrdering::parse("-title; DROP TABLE books"),
            BookOrdering::default()
        );
    }

    #[test]
    fn test_ordering_sql() {
        assert_eq!(BookOrdering::default().to_sql(), "b.title ASC, b.id ASC");
        assert_eq!(BookOrdering::parse("-id").to_sql(), "b.id DESC");
    }

    #[test]
    fn test_book_input_accepts_author_alias() {
        let input: BookInput =
            serde_json::from_str(r#"{"title":"Monk's Hood","publication_year":1980,"author":4}"#)
                .unwrap();
        assert_eq!(input.author_id, Some(4));
        assert!(input.description.is_empty());
    }
}
