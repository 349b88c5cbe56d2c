//! Services layer - Business logic
//!
//! Services validate input, apply business rules and coordinate the
//! repositories. The access gate in `access` is pure and has no storage.

pub mod access;
pub mod catalog;
pub mod comment;
pub mod library;
pub mod password;
pub mod post;
pub mod tag;
pub mod user;
pub mod validation;

pub use access::{authorize, is_owner, Decision, DenyReason, Identity, Requirement};
pub use catalog::{CatalogService, CatalogServiceError};
pub use comment::CommentService;
pub use library::{LibraryService, LibraryServiceError};
pub use password::{hash_password, verify_password};
pub use post::{BlogServiceError, PostService};
pub use tag::TagService;
pub use user::{Credential, LoginResult, UserService, UserServiceError};
pub use validation::FieldErrors;
