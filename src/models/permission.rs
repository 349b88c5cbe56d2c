//! Named permissions
//!
//! Permissions are never stored per user. Each [`UserRole`](super::UserRole)
//! grants a fixed set of them, see `UserRole::grants`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewBook,
    AddBook,
    ChangeBook,
    DeleteBook,
    AddAuthor,
    ChangeAuthor,
    DeleteAuthor,
    ManageLibrary,
    ManageUsers,
}

impl Permission {
    pub const ALL: &'static [Permission] = &[
        Permission::ViewBook,
        Permission::AddBook,
        Permission::ChangeBook,
        Permission::DeleteBook,
        Permission::AddAuthor,
        Permission::ChangeAuthor,
        Permission::DeleteAuthor,
        Permission::ManageLibrary,
        Permission::ManageUsers,
    ];

    /// Codename as exposed in error messages and profile payloads
    pub fn codename(&self) -> &'static str {
        match self {
            Permission::ViewBook => "can_view_book",
            Permission::AddBook => "can_add_book",
            Permission::ChangeBook => "can_change_book",
            Permission::DeleteBook => "can_delete_book",
            Permission::AddAuthor => "can_add_author",
            Permission::ChangeAuthor => "can_change_author",
            Permission::DeleteAuthor => "can_delete_author",
            Permission::ManageLibrary => "can_manage_library",
            Permission::ManageUsers => "can_manage_users",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codename())
    }
}
