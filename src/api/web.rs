//! Role views served as plain HTML
//!
//! - GET /library/admin - Admins only
//! - GET /library/librarian - Librarians only
//! - GET /library/member - Members only
//! - GET /accounts/login - Where anonymous visitors are sent
//!
//! Each role view needs an exact role match. Anonymous visitors are
//! redirected to the login page instead of getting a 401.

use axum::{
    extract::Query,
    middleware as axum_middleware,
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::middleware::{web_gate, AppState, CurrentUser, WebGate};
use crate::models::UserRole;
use crate::services::Requirement;

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Build the web router; `login_path` is where anonymous visitors go
pub fn router(login_path: &str) -> Router<AppState> {
    let role_view = |path: &str, role: UserRole| {
        Router::new()
            .route(path, get(role_page))
            .route_layer(axum_middleware::from_fn_with_state(
                WebGate {
                    requirement: Requirement::Role(role),
                    login_path: login_path.to_string(),
                },
                web_gate,
            ))
    };

    Router::new()
        .route("/accounts/login", get(login_page))
        .merge(role_view("/library/admin", UserRole::Admin))
        .merge(role_view("/library/librarian", UserRole::Librarian))
        .merge(role_view("/library/member", UserRole::Member))
}

/// Greets the caller with their role. The gate has already checked it.
async fn role_page(user: CurrentUser) -> Html<String> {
    let role = user
        .account
        .profile
        .as_ref()
        .map(|p| p.role.to_string())
        .unwrap_or_default();
    Html(format!(
        "<h1>{} view</h1><p>Welcome, {}.</p>",
        capitalize(&role),
        html_escape(&user.account.user.username)
    ))
}

async fn login_page(Query(query): Query<LoginQuery>) -> Html<String> {
    let next = query.next.unwrap_or_else(|| "/".to_string());
    Html(format!(
        "<h1>Log in</h1><p>POST your credentials to /api/v1/accounts/login, then continue to {}.</p>",
        html_escape(&next)
    ))
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("librarian"), "Librarian");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<b>\"x\" & y</b>"), "&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;");
    }
}
