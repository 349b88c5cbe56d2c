//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod author;
pub mod book;
pub mod comment;
pub mod library;
pub mod post;
pub mod session;
pub mod tag;
pub mod user;

pub use author::{AuthorRepository, SqlxAuthorRepository};
pub use book::{BookRecord, BookRepository, SqlxBookRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use library::{LibraryRepository, SqlxLibraryRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{ApiTokenRepository, SessionRepository, SqlxApiTokenRepository, SqlxSessionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{AccountConflict, CreatedAccount, SqlxUserRepository, UserRepository};

/// Case-folded form of text stored in the `*_key` search columns
pub fn search_key(text: &str) -> String {
    text.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_key_folds_non_ascii() {
        assert_eq!(search_key("Émile Zola"), "émile zola");
        assert_eq!(search_key("ÅSA"), search_key("åsa"));
    }
}
