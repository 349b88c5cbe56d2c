//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints.

use axum::{http::HeaderValue, middleware as axum_middleware, Router};
use serde::Deserialize;

use crate::api::middleware::{api_gate, ApiError, AppState};
use crate::models::ListParams;
use crate::services::Requirement;

const SESSION_COOKIE: &str = "session";

/// Basic pagination query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::from_query(self.page, self.page_size)
    }
}

/// Put every route of `router` behind the JSON access gate
pub fn gated(router: Router<AppState>, requirement: Requirement) -> Router<AppState> {
    router.route_layer(axum_middleware::from_fn_with_state(requirement, api_gate))
}

/// `Set-Cookie` value for a new session
pub fn session_cookie(session_id: &str, days: i64) -> Result<HeaderValue, ApiError> {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        days * 24 * 60 * 60
    );
    HeaderValue::from_str(&cookie).map_err(|_| ApiError::internal_error("Invalid session cookie"))
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
