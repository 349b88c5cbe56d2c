//! Shared helpers for the HTTP integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use libris::api::{self, AppState};
use libris::config::AuthConfig;
use libris::db::{self, DbPool};
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot`

pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = db::create_test_pool().await.expect("Failed to create test pool");
        db::migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let state = AppState::new(pool.clone(), &AuthConfig::default());
        Self {
            router: api::build_router(state, "http://localhost:3000"),
            pool,
        }
    }

    /// Send a request; `auth` is a full Authorization header value
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, auth: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, auth, None).await
    }

    pub async fn post(&self, uri: &str, auth: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, auth, Some(body)).await
    }

    pub async fn put(&self, uri: &str, auth: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, auth, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, auth: Option<&str>) -> TestResponse {
        self.send(Method::DELETE, uri, auth, None).await
    }

    /// Register an account and return its `Token <key>` header value
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .post(
                "/api/v1/accounts/register",
                None,
                serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "correct horse battery",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        format!("Token {}", response.body["token"].as_str().unwrap())
    }

    /// Give a registered user another role directly in the database
    pub async fn set_role(&self, username: &str, role: &str) {
        sqlx::query(
            "UPDATE user_profiles SET role = ? WHERE user_id = (SELECT id FROM users WHERE username = ?)",
        )
        .bind(role)
        .bind(username)
        .execute(&self.pool)
        .await
        .unwrap();
    }

    /// Create an author with an admin token and return its id
    pub async fn create_author(&self, auth: &str, name: &str) -> i64 {
        let response = self
            .post("/api/v1/authors", Some(auth), serde_json::json!({ "name": name }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_i64().unwrap()
    }

    pub async fn create_book(&self, auth: &str, title: &str, year: i32, author_id: i64) -> i64 {
        let response = self
            .post(
                "/api/v1/books",
                Some(auth),
                serde_json::json!({
                    "title": title,
                    "publication_year": year,
                    "author": author_id,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_i64().unwrap()
    }
}
