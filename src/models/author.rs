//! Author model

use serde::{Deserialize, Serialize};

use super::book::BookSummary;

/// Author entity; deleting an author deletes its books
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

/// Author together with the books written by them
#[derive(Debug, Clone, Serialize)]
pub struct AuthorWithBooks {
    pub id: i64,
    pub name: String,
    pub books: Vec<BookSummary>,
}

impl AuthorWithBooks {
    pub fn new(author: Author, books: Vec<BookSummary>) -> Self {
        Self {
            id: author.id,
            name: author.name,
            books,
        }
    }
}

/// Input for creating or replacing an author
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorInput {
    #[serde(default)]
    pub name: String,
}
