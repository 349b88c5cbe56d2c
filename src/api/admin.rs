//! Admin API endpoints
//!
//! User management, gated by `can_manage_users`:
//! - GET /api/v1/admin/users - Paginated users with profiles
//! - PUT /api/v1/admin/users/{id}/role - Change a user's role

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Router,
};
use serde::Deserialize;

use crate::api::common::{gated, PaginationQuery};
use crate::api::extract::{Json, Query};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{PagedResult, Permission, UserRole, UserWithProfile};
use crate::services::{FieldErrors, Requirement};

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    #[serde(default)]
    pub role: String,
}

/// Build the admin router
pub fn router() -> Router<AppState> {
    gated(
        Router::new()
            .route("/users", get(list_users))
            .route("/users/{id}/role", put(set_role)),
        Requirement::Permission(Permission::ManageUsers),
    )
}

/// GET /api/v1/admin/users
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<UserWithProfile>>, ApiError> {
    Ok(Json(state.user_service.list_users(&query.params()).await?))
}

/// PUT /api/v1/admin/users/{id}/role
async fn set_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<UserWithProfile>, ApiError> {
    let role: UserRole = body.role.trim().parse().map_err(|_| {
        ApiError::invalid_fields(&FieldErrors::single(
            "role",
            format!("\"{}\" is not a valid choice.", body.role),
        ))
    })?;

    Ok(Json(state.user_service.set_role(id, role).await?))
}
