//! API middleware
//!
//! Contains middleware for:
//! - Identity resolution (session cookie, bearer token, API token)
//! - Authorization gates for JSON routes (401/403) and web routes (303 to login)

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::db::repositories::{
    SqlxApiTokenRepository, SqlxAuthorRepository, SqlxBookRepository, SqlxCommentRepository,
    SqlxLibraryRepository, SqlxPostRepository, SqlxSessionRepository, SqlxTagRepository,
    SqlxUserRepository,
};
use crate::db::DbPool;
use crate::models::UserWithProfile;
use crate::services::{
    authorize, BlogServiceError, CatalogService, CatalogServiceError, CommentService, Credential,
    Decision, DenyReason, FieldErrors, Identity, LibraryService, LibraryServiceError, PostService,
    Requirement, TagService, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub user_service: Arc<UserService>,
    pub catalog_service: Arc<CatalogService>,
    pub library_service: Arc<LibraryService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub tag_service: Arc<TagService>,
    /// Session lifetime, used for the cookie Max-Age
    pub session_days: i64,
    /// Redirect target for anonymous visitors of web routes
    pub login_path: String,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: DbPool, auth: &AuthConfig) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let token_repo = SqlxApiTokenRepository::boxed(pool.clone());
        let author_repo = SqlxAuthorRepository::boxed(pool.clone());
        let book_repo = SqlxBookRepository::boxed(pool.clone());
        let library_repo = SqlxLibraryRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());

        Self {
            user_service: Arc::new(UserService::with_session_expiration(
                user_repo,
                session_repo,
                token_repo,
                auth.session_days,
            )),
            catalog_service: Arc::new(CatalogService::new(author_repo, book_repo.clone())),
            library_service: Arc::new(LibraryService::new(library_repo, book_repo)),
            post_service: Arc::new(PostService::new(post_repo.clone(), comment_repo.clone())),
            comment_service: Arc::new(CommentService::new(comment_repo, post_repo.clone())),
            tag_service: Arc::new(TagService::new(tag_repo, post_repo)),
            session_days: auth.session_days,
            login_path: auth.login_path.clone(),
            pool,
        }
    }
}

/// The authenticated caller, inserted by [`resolve_identity`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub account: UserWithProfile,
    /// The credential the request authenticated with
    pub credential: Credential,
}

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.account.user.id
    }

    pub fn identity(&self) -> Identity {
        Identity::User {
            user_id: self.account.user.id,
            role: self.account.profile.as_ref().map(|p| p.role),
        }
    }

    /// Session id, if the request authenticated with something that may be one
    pub fn session_id(&self) -> Option<&str> {
        match &self.credential {
            Credential::Session(id) | Credential::Bearer(id) => Some(id),
            Credential::ApiKey(_) => None,
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided"))
    }
}

/// Identity of the request; anonymous when no valid credential was sent
fn request_identity(request: &Request) -> Identity {
    request
        .extensions()
        .get::<CurrentUser>()
        .map(CurrentUser::identity)
        .unwrap_or(Identity::Anonymous)
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// 400 carrying per-field messages in `details`
    pub fn invalid_fields(errors: &FieldErrors) -> Self {
        let details = serde_json::to_value(errors).unwrap_or_default();
        Self::with_details("VALIDATION_ERROR", "Invalid input", details)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Log the underlying failure and hide it from the client
    fn internal(err: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:#}", err);
        Self::internal_error("Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => ApiError::validation_error(msg),
            UserServiceError::ValidationError(errors) => ApiError::invalid_fields(&errors),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::UserNotFound => ApiError::not_found("User not found"),
            UserServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<CatalogServiceError> for ApiError {
    fn from(err: CatalogServiceError) -> Self {
        match err {
            CatalogServiceError::ValidationError(errors) => ApiError::invalid_fields(&errors),
            CatalogServiceError::NotFound(msg) => ApiError::not_found(msg),
            CatalogServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<LibraryServiceError> for ApiError {
    fn from(err: LibraryServiceError) -> Self {
        match err {
            LibraryServiceError::ValidationError(errors) => ApiError::invalid_fields(&errors),
            LibraryServiceError::NotFound(msg) => ApiError::not_found(msg),
            LibraryServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

impl From<BlogServiceError> for ApiError {
    fn from(err: BlogServiceError) -> Self {
        match err {
            BlogServiceError::ValidationError(errors) => ApiError::invalid_fields(&errors),
            BlogServiceError::NotFound(msg) => ApiError::not_found(msg),
            BlogServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            BlogServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

/// Extract the credential from a request.
///
/// The Authorization header wins over the session cookie.
pub fn extract_credential(request: &Request) -> Option<Credential> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return non_empty(token).map(Credential::Bearer);
            }
            if let Some(key) = auth_str.strip_prefix("Token ") {
                return non_empty(key).map(Credential::ApiKey);
            }
        }
    }

    for cookie_header in request.headers().get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(id) = cookie.trim().strip_prefix("session=") {
                    if let Some(id) = non_empty(id) {
                        return Some(Credential::Session(id));
                    }
                }
            }
        }
    }

    None
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Resolve the caller's identity for every request.
///
/// Unknown or expired credentials leave the request anonymous; the gates
/// decide what that means for the route.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(credential) = extract_credential(&request) {
        let account = state.user_service.authenticate(&credential).await?;
        match account {
            Some(account) => {
                request
                    .extensions_mut()
                    .insert(CurrentUser { account, credential });
            }
            None => tracing::debug!("Ignoring unknown or expired credential"),
        }
    }

    Ok(next.run(request).await)
}

/// Gate for JSON routes: anonymous → 401, under-privileged → 403
pub async fn api_gate(
    State(requirement): State<Requirement>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match authorize(&request_identity(&request), &requirement) {
        Decision::Allow => Ok(next.run(request).await),
        Decision::Deny(DenyReason::Unauthenticated) => Err(ApiError::unauthorized(
            "Authentication credentials were not provided",
        )),
        Decision::Deny(DenyReason::Forbidden) => Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        )),
    }
}

/// Requirement plus login location for a web route
#[derive(Debug, Clone)]
pub struct WebGate {
    pub requirement: Requirement,
    pub login_path: String,
}

/// Gate for web routes: anonymous → 303 to the login page with `next`
pub async fn web_gate(State(gate): State<WebGate>, request: Request, next: Next) -> Response {
    match authorize(&request_identity(&request), &gate.requirement) {
        Decision::Allow => next.run(request).await,
        Decision::Deny(DenyReason::Unauthenticated) => {
            let target = login_redirect(&gate.login_path, request.uri().path());
            Redirect::to(&target).into_response()
        }
        Decision::Deny(DenyReason::Forbidden) => {
            (StatusCode::FORBIDDEN, Html("<h1>403 Forbidden</h1>")).into_response()
        }
    }
}

/// Login URL carrying the original path in `next`
pub fn login_redirect(login_path: &str, next: &str) -> String {
    format!("{}?next={}", login_path, urlencoding::encode(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_header(name: header::HeaderName, value: &str) -> Request<Body> {
        Request::builder()
            .uri("/test")
            .header(name, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_bearer() {
        let request = request_with_header(header::AUTHORIZATION, "Bearer abc-123");
        assert_eq!(
            extract_credential(&request),
            Some(Credential::Bearer("abc-123".to_string()))
        );
    }

    #[test]
    fn test_extract_api_token() {
        let request = request_with_header(header::AUTHORIZATION, "Token deadbeef");
        assert_eq!(
            extract_credential(&request),
            Some(Credential::ApiKey("deadbeef".to_string()))
        );
    }

    #[test]
    fn test_extract_session_cookie() {
        let request = request_with_header(header::COOKIE, "theme=dark; session=s-456");
        assert_eq!(
            extract_credential(&request),
            Some(Credential::Session("s-456".to_string()))
        );
    }

    #[test]
    fn test_authorization_header_wins() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer from-header")
            .header(header::COOKIE, "session=from-cookie")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract_credential(&request),
            Some(Credential::Bearer("from-header".to_string()))
        );
    }

    #[test]
    fn test_no_or_unsupported_credential() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert!(extract_credential(&request).is_none());

        let request = request_with_header(header::AUTHORIZATION, "Basic dXNlcjpwdw==");
        assert!(extract_credential(&request).is_none());

        let request = request_with_header(header::COOKIE, "session=");
        assert!(extract_credential(&request).is_none());
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::internal_error("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_fields_details() {
        let errors = FieldErrors::single("title", "This field may not be blank.");
        let error = ApiError::invalid_fields(&errors);

        assert_eq!(error.error.code, "VALIDATION_ERROR");
        assert_eq!(
            error.error.details,
            Some(serde_json::json!({"title": ["This field may not be blank."]}))
        );
    }

    #[test]
    fn test_login_redirect_encodes_next() {
        assert_eq!(
            login_redirect("/accounts/login", "/library/admin"),
            "/accounts/login?next=%2Flibrary%2Fadmin"
        );
    }
}
