//! User model
//!
//! This module defines the User entity, its one-to-one profile and the role
//! carried by that profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::permission::Permission;

/// User entity representing a registered account.
///
/// Authorization data (the role) lives on the associated [`UserProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique, compared case-insensitively)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed, see `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            first_name: String::new(),
            last_name: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Role stored on a user's profile.
///
/// - Admin: full access, including deletes and user management
/// - Librarian: catalog edits plus library management
/// - Member: catalog edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Librarian,
    Member,
}

impl UserRole {
    /// All roles, most privileged first
    pub const ALL: [UserRole; 3] = [UserRole::Admin, UserRole::Librarian, UserRole::Member];

    /// Named permissions granted by this role
    pub fn grants(&self) -> &'static [Permission] {
        match self {
            UserRole::Admin => Permission::ALL,
            UserRole::Librarian => &[
                Permission::ViewBook,
                Permission::AddBook,
                Permission::ChangeBook,
                Permission::AddAuthor,
                Permission::ChangeAuthor,
                Permission::ManageLibrary,
            ],
            UserRole::Member => &[
                Permission::ViewBook,
                Permission::AddBook,
                Permission::ChangeBook,
                Permission::AddAuthor,
                Permission::ChangeAuthor,
            ],
        }
    }

    /// Check whether this role grants the given permission
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.grants().contains(&permission)
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Member
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Librarian => write!(f, "librarian"),
            UserRole::Member => write!(f, "member"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "librarian" => Ok(UserRole::Librarian),
            "member" => Ok(UserRole::Member),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Profile attached one-to-one to every user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub role: UserRole,
    pub bio: String,
    /// Avatar image URL
    pub avatar: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: i64, role: UserRole) -> Self {
        Self {
            user_id,
            role,
            bio: String::new(),
            avatar: None,
        }
    }
}

/// User joined with its profile, as returned by account endpoints
#[derive(Debug, Clone, Serialize)]
pub struct UserWithProfile {
    #[serde(flatten)]
    pub user: User,
    /// Missing only for rows created outside the registration flow
    pub profile: Option<UserProfile>,
}

/// Input for registering a new account (before password hashing)
#[derive(Debug, Clone, Default)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    /// When present, must equal `password`
    pub password_confirm: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

/// Input for updating one's own profile
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "testuser".to_string(),
            "test@example.com".to_string(),
            "hashed_password".to_string(),
        );

        assert_eq!(user.id, 0);
        assert_eq!(user.username, "testuser");
        assert_eq!(user.email, "test@example.com");
        assert!(user.first_name.is_empty());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("a".to_string(), "a@b.io".to_string(), "secret".to_string());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_user_role_display() {
        assert_eq!(UserRole::Admin.to_string(), "admin");
        assert_eq!(UserRole::Librarian.to_string(), "librarian");
        assert_eq!(UserRole::Member.to_string(), "member");
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from_str("admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("Librarian").unwrap(), UserRole::Librarian);
        assert_eq!(UserRole::from_str("MEMBER").unwrap(), UserRole::Member);
        assert!(UserRole::from_str("editor").is_err());
    }

    #[test]
    fn test_user_role_default() {
        assert_eq!(UserRole::default(), UserRole::Member);
    }

    #[test]
    fn test_admin_has_every_permission() {
        for permission in Permission::ALL {
            assert!(UserRole::Admin.has_permission(*permission));
        }
    }

    #[test]
    fn test_member_cannot_delete() {
        assert!(UserRole::Member.has_permission(Permission::AddBook));
        assert!(UserRole::Member.has_permission(Permission::ChangeBook));
        assert!(!UserRole::Member.has_permission(Permission::DeleteBook));
        assert!(!UserRole::Member.has_permission(Permission::DeleteAuthor));
        assert!(!UserRole::Member.has_permission(Permission::ManageLibrary));
    }

    #[test]
    fn test_librarian_manages_libraries_only() {
        assert!(UserRole::Librarian.has_permission(Permission::ManageLibrary));
        assert!(!UserRole::Librarian.has_permission(Permission::DeleteBook));
        assert!(!UserRole::Librarian.has_permission(Permission::ManageUsers));
    }

    #[test]
    fn test_grants_are_nested() {
        for permission in UserRole::Member.grants() {
            assert!(UserRole::Librarian.has_permission(*permission));
        }
        for permission in UserRole::Librarian.grants() {
            assert!(UserRole::Admin.has_permission(*permission));
        }
    }
}
