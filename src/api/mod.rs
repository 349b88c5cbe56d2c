//! API layer - HTTP handlers and routing
//!
//! JSON endpoints are nested under `/api/v1`:
//! - Accounts (register, login, logout, profile)
//! - Admin user management
//! - Authors and books
//! - Libraries
//! - Posts, comments and tags
//!
//! The role views under `/library` are plain HTML and redirect anonymous
//! visitors to the login page.

pub mod accounts;
pub mod admin;
pub mod authors;
pub mod books;
pub mod comments;
pub mod common;
pub mod extract;
pub mod libraries;
pub mod middleware;
pub mod posts;
pub mod tags;
pub mod web;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, CurrentUser};

/// Build the JSON API router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .nest("/accounts", accounts::router())
        .nest("/admin", admin::router())
        .merge(authors::router())
        .merge(books::router())
        .merge(libraries::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(tags::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let web_routes = web::router(&state.login_path);

    Router::new()
        .nest("/api/v1", build_api_router())
        .merge(web_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_identity,
        ))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for a single origin, with cookies allowed
fn cors_layer(cors_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!("Ignoring invalid CORS origin '{}'", cors_origin);
            cors
        }
    }
}
