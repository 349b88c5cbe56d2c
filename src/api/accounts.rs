//! Account API endpoints
//!
//! - POST /api/v1/accounts/register - Create an account (profile and API token included)
//! - POST /api/v1/accounts/login - Start a session and return the API token
//! - POST /api/v1/accounts/logout - End the current session
//! - GET/PUT /api/v1/accounts/profile - Read or update the caller's profile

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::common::{clear_session_cookie, gated, session_cookie};
use crate::api::extract::Json;
use crate::api::middleware::{ApiError, AppState, CurrentUser};
use crate::models::{CreateUserInput, UpdateProfileInput, UserWithProfile};
use crate::services::Requirement;

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub password_confirm: Option<String>,
    pub bio: Option<String>,
    #[serde(alias = "profile_picture")]
    pub avatar: Option<String>,
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "username")]
    pub username_or_email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserWithProfile,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserWithProfile,
    pub token: String,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Request body for profile updates; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    #[serde(alias = "profile_picture")]
    pub avatar: Option<String>,
}

/// Build the accounts router
pub fn router() -> Router<AppState> {
    let protected = gated(
        Router::new()
            .route("/logout", post(logout))
            .route("/profile", get(get_profile).put(update_profile)),
        Requirement::Authenticated,
    );

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
}

/// POST /api/v1/accounts/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateUserInput {
        username: body.username,
        email: body.email,
        password: body.password,
        password_confirm: body.password_confirm,
        bio: body.bio,
        avatar: body.avatar,
    };

    let account = state.user_service.register(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserWithProfile {
                user: account.user,
                profile: Some(account.profile),
            },
            token: account.token.key,
        }),
    ))
}

/// POST /api/v1/accounts/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .user_service
        .login(&body.username_or_email, &body.password)
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(&result.session.id, state.session_days)?,
    );

    Ok((
        headers,
        Json(LoginResponse {
            user: UserWithProfile {
                user: result.user,
                profile: result.profile,
            },
            token: result.token.key,
            session_id: result.session.id,
            expires_at: result.session.expires_at,
        }),
    ))
}

/// POST /api/v1/accounts/logout
///
/// Deletes the session the request authenticated with. API tokens stay valid.
async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(session_id) = user.session_id() {
        state.user_service.logout(session_id).await?;
    }

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, clear_session_cookie());
    Ok((StatusCode::NO_CONTENT, headers))
}

/// GET /api/v1/accounts/profile
async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UserWithProfile>, ApiError> {
    Ok(Json(state.user_service.get_account(user.id()).await?))
}

/// PUT /api/v1/accounts/profile
async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserWithProfile>, ApiError> {
    let input = UpdateProfileInput {
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        bio: body.bio,
        avatar: body.avatar,
    };
    Ok(Json(state.user_service.update_profile(user.id(), input).await?))
}
