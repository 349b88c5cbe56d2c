//! JSON body and query string extractors
//!
//! Drop-in replacements for `axum::Json` and `axum::extract::Query` whose
//! rejections use the API error body. Deserialization failures become a 400
//! `VALIDATION_ERROR` keyed on the offending field.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Request,
    },
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::api::middleware::ApiError;
use crate::services::FieldErrors;

/// Field used when a failure cannot be tied to one field
pub const NON_FIELD_KEY: &str = "non_field_errors";

/// JSON request body or response
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(Query(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    tracing::debug!("Rejected JSON body: {}", rejection.body_text());
    match rejection {
        JsonRejection::JsonDataError(err) => deserialize_error(&err.body_text()),
        JsonRejection::JsonSyntaxError(err) => ApiError::invalid_fields(&FieldErrors::single(
            NON_FIELD_KEY,
            format!("Malformed JSON: {}", strip_location(detail(&err.body_text()))),
        )),
        JsonRejection::MissingJsonContentType(_) => ApiError::invalid_fields(&FieldErrors::single(
            NON_FIELD_KEY,
            "Expected request with `Content-Type: application/json`",
        )),
        other => ApiError::validation_error(other.body_text()),
    }
}

fn query_rejection(rejection: QueryRejection) -> ApiError {
    tracing::debug!("Rejected query string: {}", rejection.body_text());
    deserialize_error(&rejection.body_text())
}

/// Turn a rejection text into per-field errors
///
/// The text reads `<summary>: [<path>: ]<serde message>`; the path is absent
/// for failures at the top level, such as a missing field.
fn deserialize_error(text: &str) -> ApiError {
    let (field, message) = field_and_message(detail(text));
    ApiError::invalid_fields(&FieldErrors::single(&field, message))
}

/// Everything after the rejection summary
fn detail(text: &str) -> &str {
    text.split_once(": ").map(|(_, rest)| rest).unwrap_or(text)
}

fn field_and_message(detail: &str) -> (String, String) {
    if let Some((path, message)) = detail.split_once(": ") {
        if !path.is_empty() && !path.contains(char::is_whitespace) {
            return (path.to_string(), strip_location(message).to_string());
        }
    }

    let message = strip_location(detail);
    if let Some(rest) = message.strip_prefix("missing field `") {
        if let Some((field, _)) = rest.split_once('`') {
            return (field.to_string(), "This field is required.".to_string());
        }
    }
    (NON_FIELD_KEY.to_string(), message.to_string())
}

/// Drop serde_json's trailing ` at line N column M`
fn strip_location(message: &str) -> &str {
    match message.rfind(" at line ") {
        Some(idx) => &message[..idx],
        None => message,
    }
}
