//! Role-based access gate
//!
//! Every protected operation states a [`Requirement`]; [`authorize`] checks it
//! against the caller's [`Identity`]. The role on the user's profile is the
//! single source of truth: named permissions are derived from it through
//! `UserRole::grants`. Resource ownership is a separate predicate
//! ([`is_owner`]) applied by the blog services after the gate has passed.

use crate::models::{Permission, UserRole};

/// Who is making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User {
        user_id: i64,
        /// None when the profile row is missing
        role: Option<UserRole>,
    },
}

impl Identity {
    pub fn user(user_id: i64, role: UserRole) -> Self {
        Identity::User {
            user_id,
            role: Some(role),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Identity::Anonymous => None,
            Identity::User { user_id, .. } => Some(*user_id),
        }
    }

    pub fn role(&self) -> Option<UserRole> {
        match self {
            Identity::Anonymous => None,
            Identity::User { role, .. } => *role,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::User { .. })
    }
}

/// What an operation needs from the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any logged-in user
    Authenticated,
    /// Exactly this role
    Role(UserRole),
    /// A role that grants this permission
    Permission(Permission),
    /// Every listed requirement
    All(Vec<Requirement>),
}

/// Why access was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No identity; the client should log in
    Unauthenticated,
    /// Logged in but not allowed
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        *self == Decision::Allow
    }
}

/// Decide whether `identity` satisfies `requirement`.
///
/// Anonymous callers are always denied as `Unauthenticated`, even for
/// requirements they could never meet once logged in. A user without a
/// profile passes `Authenticated` but nothing role-based.
pub fn authorize(identity: &Identity, requirement: &Requirement) -> Decision {
    let role = match identity {
        Identity::Anonymous => return Decision::Deny(DenyReason::Unauthenticated),
        Identity::User { role, .. } => *role,
    };

    let allowed = satisfies(role, requirement);
    if allowed {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::Forbidden)
    }
}

fn satisfies(role: Option<UserRole>, requirement: &Requirement) -> bool {
    match requirement {
        Requirement::Authenticated => true,
        Requirement::Role(required) => role == Some(*required),
        Requirement::Permission(permission) => {
            role.map_or(false, |r| r.has_permission(*permission))
        }
        Requirement::All(requirements) => requirements.iter().all(|r| satisfies(role, r)),
    }
}

/// True when the identity is the owner of a resource
pub fn is_owner(identity: &Identity, owner_id: i64) -> bool {
    identity.user_id() == Some(owner_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_is_unauthenticated() {
        assert_eq!(
            authorize(&Identity::Anonymous, &Requirement::Authenticated),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            authorize(&Identity::Anonymous, &Requirement::Permission(Permission::ViewBook)),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn test_member_can_add_but_not_delete() {
        let member = Identity::user(2, UserRole::Member);

        assert!(authorize(&member, &Requirement::Permission(Permission::AddBook)).is_allowed());
        assert_eq!(
            authorize(&member, &Requirement::Permission(Permission::DeleteBook)),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn test_admin_can_delete() {
        let admin = Identity::user(1, UserRole::Admin);
        assert!(authorize(&admin, &Requirement::Permission(Permission::DeleteBook)).is_allowed());
    }

    #[test]
    fn test_role_views_need_exact_role() {
        let admin = Identity::user(1, UserRole::Admin);
        let librarian = Identity::user(2, UserRole::Librarian);

        assert!(authorize(&admin, &Requirement::Role(UserRole::Admin)).is_allowed());
        assert!(!authorize(&admin, &Requirement::Role(UserRole::Member)).is_allowed());
        assert!(authorize(&librarian, &Requirement::Role(UserRole::Librarian)).is_allowed());
        assert!(!authorize(&librarian, &Requirement::Role(UserRole::Admin)).is_allowed());
    }

    #[test]
    fn test_missing_profile_denies_role_checks() {
        let orphan = Identity::User {
            user_id: 9,
            role: None,
        };

        assert!(authorize(&orphan, &Requirement::Authenticated).is_allowed());
        assert_eq!(
            authorize(&orphan, &Requirement::Permission(Permission::ViewBook)),
            Decision::Deny(DenyReason::Forbidden)
        );
        assert!(!authorize(&orphan, &Requirement::Role(UserRole::Member)).is_allowed());
    }

    #[test]
    fn test_all_composes_with_and() {
        let librarian = Identity::user(3, UserRole::Librarian);
        let both = Requirement::All(vec![
            Requirement::Permission(Permission::ManageLibrary),
            Requirement::Permission(Permission::AddBook),
        ]);
        let one_missing = Requirement::All(vec![
            Requirement::Permission(Permission::ManageLibrary),
            Requirement::Permission(Permission::ManageUsers),
        ]);

        assert!(authorize(&librarian, &both).is_allowed());
        assert!(!authorize(&librarian, &one_missing).is_allowed());
        assert!(authorize(&librarian, &Requirement::All(vec![])).is_allowed());
    }

    #[test]
    fn test_is_owner() {
        let user = Identity::user(5, UserRole::Member);
        assert!(is_owner(&user, 5));
        assert!(!is_owner(&user, 6));
        assert!(!is_owner(&Identity::Anonymous, 5));
    }
}
