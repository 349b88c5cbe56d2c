//! Data models
//!
//! This module contains the data structures used throughout Libris:
//! - Database entities (User, UserProfile, Session, ApiToken, Author, Book,
//!   Library, Librarian, Post, Tag, Comment)
//! - API request inputs and list filters
//! - The role/permission vocabulary used by the access gate

mod author;
mod book;
mod comment;
mod library;
mod pagination;
mod permission;
mod post;
mod session;
mod tag;
mod user;

pub use author::{Author, AuthorInput, AuthorWithBooks};
pub use book::{AuthorFilter, Book, BookFilter, BookInput, BookOrderField, BookOrdering, BookSummary};
pub use comment::{Comment, CommentInput, CommentWithAuthor};
pub use library::{Librarian, LibrarianInput, Library, LibraryDetail, LibraryInput};
pub use pagination::{ListParams, PagedResult, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use permission::Permission;
pub use post::{CreatePostInput, Post, PostDetail, PostFilter, PostWithMeta, UpdatePostInput};
pub use session::{ApiToken, Session, API_TOKEN_LENGTH};
pub use tag::{normalize_tag_names, Tag};
pub use user::{CreateUserInput, UpdateProfileInput, User, UserProfile, UserRole, UserWithProfile};
