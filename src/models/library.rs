//! Library and librarian models

use serde::{Deserialize, Serialize};

use super::book::Book;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub id: i64,
    pub name: String,
}

/// The single librarian assigned to a library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Librarian {
    pub id: i64,
    pub name: String,
    pub library_id: i64,
}

/// Library with its holdings and librarian
#[derive(Debug, Clone, Serialize)]
pub struct LibraryDetail {
    pub id: i64,
    pub name: String,
    pub books: Vec<Book>,
    pub librarian: Option<Librarian>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryInput {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibrarianInput {
    #[serde(default)]
    pub name: String,
}
