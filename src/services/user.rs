//! User service
//!
//! Implements business logic for accounts:
//! - Registration (first user becomes admin, profile and API token created
//!   in the same transaction)
//! - Login/logout with expiring sessions
//! - Resolving a session id or API key to a user
//! - Profile updates and role management

use crate::db::repositories::{
    AccountConflict, ApiTokenRepository, CreatedAccount, SessionRepository, UserRepository,
};
use crate::models::{
    ApiToken, CreateUserInput, ListParams, PagedResult, Session, UpdateProfileInput, User,
    UserProfile, UserRole, UserWithProfile,
};
use crate::services::password::{hash_password, verify_password};
use crate::services::validation::{is_valid_email, FieldErrors};
use anyhow::Context;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

pub const DUPLICATE_EMAIL_MESSAGE: &str = "A user with that email already exists.";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Field-level validation failure
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    /// Username already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    UserNotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

fn username_taken(username: &str) -> UserServiceError {
    UserServiceError::UserExists(format!("Username '{}' is already taken", username))
}

/// A credential presented by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Session id from the session cookie
    Session(String),
    /// API key from `Authorization: Token <key>`
    ApiKey(String),
    /// `Authorization: Bearer <value>`; either a session id or an API key
    Bearer(String),
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: User,
    pub profile: Option<UserProfile>,
    pub session: Session,
    pub token: ApiToken,
}

/// User service for managing accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    token_repo: Arc<dyn ApiTokenRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        token_repo: Arc<dyn ApiTokenRepository>,
    ) -> Self {
        Self::with_session_expiration(
            user_repo,
            session_repo,
            token_repo,
            DEFAULT_SESSION_EXPIRATION_DAYS,
        )
    }

    /// Create a new user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        token_repo: Arc<dyn ApiTokenRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            token_repo,
            session_expiration_days,
        }
    }

    /// Register a new account.
    ///
    /// The first account ever created becomes `Admin`; later ones are
    /// `Member`.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for blank fields, a malformed or duplicate email,
    ///   or a password confirmation mismatch
    /// - `UserExists` if the username is taken
    pub async fn register(&self, input: CreateUserInput) -> Result<CreatedAccount, UserServiceError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();

        let mut errors = FieldErrors::new();
        errors.require("username", &username);
        errors.require("email", &email);
        if input.password.is_empty() {
            errors.add("password", crate::services::validation::BLANK_MESSAGE);
        }
        if !email.is_empty() && !is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }
        if let Some(confirm) = &input.password_confirm {
            if *confirm != input.password {
                errors.add("password_confirm", "Passwords do not match.");
            }
        }
        if !errors.has("email") && self.user_repo.get_by_email(&email).await?.is_some() {
            errors.add("email", DUPLICATE_EMAIL_MESSAGE);
        }
        errors.into_result().map_err(UserServiceError::ValidationError)?;

        if self.user_repo.get_by_username(&username).await?.is_some() {
            return Err(username_taken(&username));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(username, email, password_hash);
        let profile = UserProfile {
            bio: input.bio.unwrap_or_default(),
            avatar: input.avatar.filter(|a| !a.trim().is_empty()),
            ..UserProfile::new(0, UserRole::default())
        };

        // A concurrent registration can still win the unique constraints
        let account = match self
            .user_repo
            .create_account(&user, &profile, &ApiToken::generate_key())
            .await
        {
            Ok(account) => account,
            Err(err) => {
                return Err(match err.downcast_ref::<AccountConflict>() {
                    Some(AccountConflict::Username) => username_taken(&user.username),
                    Some(AccountConflict::Email) => UserServiceError::ValidationError(
                        FieldErrors::single("email", DUPLICATE_EMAIL_MESSAGE),
                    ),
                    None => UserServiceError::InternalError(err.context("Failed to create account")),
                })
            }
        };

        tracing::info!(
            user_id = account.user.id,
            role = %account.profile.role,
            "Registered user {}",
            account.user.username
        );

        Ok(account)
    }

    /// Log in with a username or email address.
    ///
    /// Creates a new session and returns the user's API token, creating it
    /// if the user has none yet.
    pub async fn login(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<LoginResult, UserServiceError> {
        let user = match self.find_user_by_username_or_email(username_or_email.trim()).await? {
            Some(user) => user,
            None => {
                return Err(UserServiceError::AuthenticationError(
                    "Invalid credentials".to_string(),
                ))
            }
        };

        let valid = verify_password(password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            tracing::debug!(user_id = user.id, "Rejected login with wrong password");
            return Err(UserServiceError::AuthenticationError(
                "Invalid credentials".to_string(),
            ));
        }

        let session = Session::start(user.id, self.session_expiration_days);
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        let token = self
            .token_repo
            .get_or_create(user.id, &ApiToken::generate_key())
            .await
            .context("Failed to get API token")?;
        let profile = self.user_repo.get_profile(user.id).await?;

        Ok(LoginResult {
            user,
            profile,
            session,
            token,
        })
    }

    /// Logout by deleting the session
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a credential to its user.
    ///
    /// Expired sessions are deleted and treated as absent.
    pub async fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<Option<UserWithProfile>, UserServiceError> {
        let user_id = match credential {
            Credential::Session(id) => self.session_user(id).await?,
            Credential::ApiKey(key) => self.token_user(key).await?,
            Credential::Bearer(value) => match self.session_user(value).await? {
                Some(id) => Some(id),
                None => self.token_user(value).await?,
            },
        };

        match user_id {
            Some(id) => self.load_account(id).await,
            None => Ok(None),
        }
    }

    /// Get a user with its profile
    pub async fn get_account(&self, user_id: i64) -> Result<UserWithProfile, UserServiceError> {
        self.load_account(user_id)
            .await?
            .ok_or(UserServiceError::UserNotFound)
    }

    /// Update the caller's own names, email, bio and avatar
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<UserWithProfile, UserServiceError> {
        let account = self.get_account(user_id).await?;
        let mut user = account.user;

        let mut errors = FieldErrors::new();
        if let Some(email) = &input.email {
            let email = email.trim();
            if email.is_empty() {
                errors.add("email", crate::services::validation::BLANK_MESSAGE);
            } else if !is_valid_email(email) {
                errors.add("email", "Enter a valid email address.");
            } else if let Some(other) = self.user_repo.get_by_email(email).await? {
                if other.id != user.id {
                    errors.add("email", DUPLICATE_EMAIL_MESSAGE);
                }
            }
        }
        errors.into_result().map_err(UserServiceError::ValidationError)?;

        if let Some(email) = input.email {
            user.email = email.trim().to_string();
        }
        if let Some(first_name) = input.first_name {
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = input.last_name {
            user.last_name = last_name.trim().to_string();
        }
        let user = self.user_repo.update(&user).await.context("Failed to update user")?;

        let profile = match account.profile {
            Some(mut profile) if input.bio.is_some() || input.avatar.is_some() => {
                if let Some(bio) = input.bio {
                    profile.bio = bio;
                }
                if let Some(avatar) = input.avatar {
                    profile.avatar = Some(avatar).filter(|a| !a.trim().is_empty());
                }
                Some(
                    self.user_repo
                        .update_profile(&profile)
                        .await
                        .context("Failed to update profile")?,
                )
            }
            other => other,
        };

        Ok(UserWithProfile { user, profile })
    }

    /// Change a user's role
    pub async fn set_role(
        &self,
        user_id: i64,
        role: UserRole,
    ) -> Result<UserWithProfile, UserServiceError> {
        let updated = self
            .user_repo
            .set_role(user_id, role)
            .await
            .context("Failed to set role")?;
        if !updated {
            return Err(UserServiceError::UserNotFound);
        }

        tracing::info!(user_id, role = %role, "Changed user role");
        self.get_account(user_id).await
    }

    /// List users with their profiles
    pub async fn list_users(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<UserWithProfile>, UserServiceError> {
        let (users, total) = self
            .user_repo
            .list(params.page as i64, params.limit())
            .await
            .context("Failed to list users")?;

        Ok(PagedResult::new(users, total, params))
    }

    /// Clean up expired sessions
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }

    async fn session_user(&self, session_id: &str) -> Result<Option<i64>, UserServiceError> {
        let session = match self.session_repo.get_by_id(session_id).await? {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(&session.id)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        Ok(Some(session.user_id))
    }

    async fn token_user(&self, key: &str) -> Result<Option<i64>, UserServiceError> {
        let token = self
            .token_repo
            .get_by_key(key)
            .await
            .context("Failed to look up API token")?;
        Ok(token.map(|t| t.user_id))
    }

    async fn load_account(&self, user_id: i64) -> Result<Option<UserWithProfile>, UserServiceError> {
        let user = match self.user_repo.get_by_id(user_id).await? {
            Some(user) => user,
            None => return Ok(None),
        };
        let profile = self.user_repo.get_profile(user_id).await?;
        Ok(Some(UserWithProfile { user, profile }))
    }

    async fn find_user_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, UserServiceError> {
        if let Some(user) = self
            .user_repo
            .get_by_username(username_or_email)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }

        let user = self
            .user_repo
            .get_by_email(username_or_email)
            .await
            .context("Failed to get user by email")?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxApiTokenRepository, SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use chrono::{Duration, Utc};

    async fn setup_test_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            SqlxApiTokenRepository::boxed(pool),
        )
    }

    /// Repository whose lookups miss, as when a concurrent registration
    /// commits between the duplicate checks and the insert
    struct LateCommitRepository(Arc<dyn UserRepository>);

    #[async_trait::async_trait]
    impl UserRepository for LateCommitRepository {
        async fn create_account(
            &self,
            user: &User,
            profile: &UserProfile,
            token_key: &str,
        ) -> anyhow::Result<CreatedAccount> {
            self.0.create_account(user, profile, token_key).await
        }
        async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
            self.0.get_by_id(id).await
        }
        async fn get_by_username(&self, _username: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn get_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn update(&self, user: &User) -> anyhow::Result<User> {
            self.0.update(user).await
        }
        async fn get_profile(&self, user_id: i64) -> anyhow::Result<Option<UserProfile>> {
            self.0.get_profile(user_id).await
        }
        async fn update_profile(&self, profile: &UserProfile) -> anyhow::Result<UserProfile> {
            self.0.update_profile(profile).await
        }
        async fn set_role(&self, user_id: i64, role: UserRole) -> anyhow::Result<bool> {
            self.0.set_role(user_id, role).await
        }
        async fn count(&self) -> anyhow::Result<i64> {
            self.0.count().await
        }
        async fn list(
            &self,
            page: i64,
            per_page: i64,
        ) -> anyhow::Result<(Vec<UserWithProfile>, i64)> {
            self.0.list(page, per_page).await
        }
    }

    fn input(username: &str, email: &str, password: &str) -> CreateUserInput {
        CreateUserInput {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_first_user_becomes_admin() {
        let service = setup_test_service().await;

        let first = service
            .register(input("abbot", "abbot@abbey.org", "pw"))
            .await
            .expect("Failed to register");
        let second = service
            .register(input("novice", "novice@abbey.org", "pw"))
            .await
            .expect("Failed to register");

        assert_eq!(first.profile.role, UserRole::Admin);
        assert_eq!(second.profile.role, UserRole::Member);
        assert_eq!(second.token.key.len(), 40);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_validation_error() {
        let service = setup_test_service().await;
        service
            .register(input("one", "Same@Abbey.org", "pw"))
            .await
            .expect("Failed to register");

        let result = service.register(input("two", "same@abbey.org", "pw")).await;

        match result {
            Err(UserServiceError::ValidationError(errors)) => {
                assert_eq!(errors.messages("email"), &[DUPLICATE_EMAIL_MESSAGE.to_string()]);
            }
            other => panic!("Expected validation error, got {:?}", other.map(|a| a.user.id)),
        }
    }

    #[tokio::test]
    async fn test_register_losing_unique_race() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = UserService::new(
            Arc::new(LateCommitRepository(SqlxUserRepository::boxed(pool.clone()))),
            SqlxSessionRepository::boxed(pool.clone()),
            SqlxApiTokenRepository::boxed(pool),
        );
        service
            .register(input("cadfael", "cadfael@abbey.org", "pw"))
            .await
            .expect("Failed to register");

        let same_name = service
            .register(input("cadfael", "brother@abbey.org", "pw"))
            .await;
        assert!(matches!(same_name, Err(UserServiceError::UserExists(_))));

        let same_email = service
            .register(input("brother", "Cadfael@Abbey.org", "pw"))
            .await;
        match same_email {
            Err(UserServiceError::ValidationError(errors)) => {
                assert_eq!(errors.messages("email"), &[DUPLICATE_EMAIL_MESSAGE.to_string()]);
            }
            other => panic!("expected email validation error, got {:?}", other.map(|a| a.user.id)),
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let service = setup_test_service().await;
        service
            .register(input("cadfael", "a@abbey.org", "pw"))
            .await
            .expect("Failed to register");

        let result = service.register(input("cadfael", "b@abbey.org", "pw")).await;

        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_validates_fields() {
        let service = setup_test_service().await;

        let mut bad = input(" ", "not-an-email", "");
        bad.password_confirm = Some("x".to_string());
        let result = service.register(bad).await;

        match result {
            Err(UserServiceError::ValidationError(errors)) => {
                assert!(errors.has("username"));
                assert!(errors.has("email"));
                assert!(errors.has("password"));
                assert!(errors.has("password_confirm"));
            }
            _ => panic!("Expected validation error"),
        }
    }

    #[tokio::test]
    async fn test_login_with_username_or_email() {
        let service = setup_test_service().await;
        let account = service
            .register(input("cadfael", "cadfael@abbey.org", "herbs"))
            .await
            .unwrap();

        let by_name = service.login("cadfael", "herbs").await.expect("Login failed");
        let by_email = service
            .login("CADFAEL@abbey.org", "herbs")
            .await
            .expect("Login failed");

        assert_eq!(by_name.user.id, account.user.id);
        assert_eq!(by_email.user.id, account.user.id);
        assert_eq!(by_name.token.key, account.token.key);
        assert_ne!(by_name.session.id, by_email.session.id);
    }

    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let service = setup_test_service().await;
        service
            .register(input("cadfael", "cadfael@abbey.org", "herbs"))
            .await
            .unwrap();

        let wrong_password = service.login("cadfael", "wrong").await;
        let unknown = service.login("nobody", "herbs").await;

        assert!(matches!(wrong_password, Err(UserServiceError::AuthenticationError(_))));
        assert!(matches!(unknown, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_authenticate_session_token_and_bearer() {
        let service = setup_test_service().await;
        service
            .register(input("cadfael", "cadfael@abbey.org", "herbs"))
            .await
            .unwrap();
        let login = service.login("cadfael", "herbs").await.unwrap();

        for credential in [
            Credential::Session(login.session.id.clone()),
            Credential::ApiKey(login.token.key.clone()),
            Credential::Bearer(login.session.id.clone()),
            Credential::Bearer(login.token.key.clone()),
        ] {
            let account = service
                .authenticate(&credential)
                .await
                .expect("Authentication errored")
                .expect("Credential should resolve");
            assert_eq!(account.user.username, "cadfael");
        }

        let session_as_key = service
            .authenticate(&Credential::ApiKey(login.session.id.clone()))
            .await
            .unwrap();
        assert!(session_as_key.is_none());
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let service = setup_test_service().await;
        service
            .register(input("cadfael", "cadfael@abbey.org", "herbs"))
            .await
            .unwrap();
        let login = service.login("cadfael", "herbs").await.unwrap();

        service.logout(&login.session.id).await.expect("Logout failed");

        let account = service
            .authenticate(&Credential::Session(login.session.id))
            .await
            .unwrap();
        assert!(account.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_does_not_authenticate() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            session_repo.clone(),
            SqlxApiTokenRepository::boxed(pool),
        );
        let account = service
            .register(input("cadfael", "cadfael@abbey.org", "herbs"))
            .await
            .unwrap();

        let mut session = Session::start(account.user.id, 1);
        session.expires_at = Utc::now() - Duration::minutes(5);
        session_repo.create(&session).await.unwrap();

        let resolved = service
            .authenticate(&Credential::Session(session.id.clone()))
            .await
            .unwrap();

        assert!(resolved.is_none());
        assert!(session_repo.get_by_id(&session.id).await.unwrap().is_none());

        let mut stale = Session::start(account.user.id, 1);
        stale.expires_at = Utc::now() - Duration::minutes(5);
        session_repo.create(&stale).await.unwrap();
        let live = Session::start(account.user.id, 1);
        session_repo.create(&live).await.unwrap();

        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 1);
        assert!(session_repo.get_by_id(&live.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_profile_email_check_excludes_self() {
        let service = setup_test_service().await;
        let me = service
            .register(input("me", "me@abbey.org", "pw"))
            .await
            .unwrap();
        service
            .register(input("other", "other@abbey.org", "pw"))
            .await
            .unwrap();

        let same = service
            .update_profile(
                me.user.id,
                UpdateProfileInput {
                    email: Some("ME@abbey.org".to_string()),
                    bio: Some("Prior".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("Keeping own email should pass");
        assert_eq!(same.profile.map(|p| p.bio), Some("Prior".to_string()));

        let taken = service
            .update_profile(
                me.user.id,
                UpdateProfileInput {
                    email: Some("other@abbey.org".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(taken, Err(UserServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_set_role_and_list() {
        let service = setup_test_service().await;
        service.register(input("admin", "admin@abbey.org", "pw")).await.unwrap();
        let member = service
            .register(input("member", "member@abbey.org", "pw"))
            .await
            .unwrap();

        let updated = service
            .set_role(member.user.id, UserRole::Librarian)
            .await
            .expect("Failed to set role");
        assert_eq!(updated.profile.map(|p| p.role), Some(UserRole::Librarian));

        assert!(matches!(
            service.set_role(404, UserRole::Admin).await,
            Err(UserServiceError::UserNotFound)
        ));

        let page = service.list_users(&ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
    }
}
