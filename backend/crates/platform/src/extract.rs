//! Request extractors with taxonomy-shaped rejections
//!
//! `axum::Json` / `axum::extract::Query` reject with plain-text bodies. These
//! wrappers reject with [`AppError`] instead so the error envelope carries
//! `details.errors = [{ field, message, type }]`.
//!
//! - malformed JSON: 400 `BadRequestError`
//! - wrong shape, missing field, missing content type: 422 `ValidationError`

use std::error::Error as StdError;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use kernel::error::app_error::AppError;
use serde::Serialize;
use serde_json::json;

/// Message of every 422 produced here
pub const VALIDATION_FAILED: &str = "Request validation failed";

pub const BODY_TOO_LARGE: &str = "Request body is too large";

pub const BODY_UNREADABLE: &str = "Request body could not be read";

/// JSON body extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

/// Query string extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(validation_failed(field_error(&rejection, "query"))),
        }
    }
}

/// One entry of `details.errors`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonSyntaxError(e) => {
            tracing::debug!(error = %e, "Malformed JSON body");
            AppError::bad_request("Malformed JSON in request body")
        }
        JsonRejection::MissingJsonContentType(_) => validation_failed(FieldError {
            field: "body".to_string(),
            message: "Expected request with `Content-Type: application/json`".to_string(),
            kind: "content_type",
        }),
        JsonRejection::JsonDataError(e) => validation_failed(field_error(&e, "body")),
        JsonRejection::BytesRejection(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::debug!(error = %e, "Request body over the size limit");
            AppError::bad_request(BODY_TOO_LARGE)
        }
        other => {
            tracing::debug!(error = %other.body_text(), "Unreadable request body");
            AppError::bad_request(BODY_UNREADABLE)
        }
    }
}

fn validation_failed(error: FieldError) -> AppError {
    AppError::validation(VALIDATION_FAILED).with_details(json!({ "errors": [error] }))
}

/// Pull the offending field out of a deserialization failure
///
/// axum deserializes through `serde_path_to_error`, so the path and serde's
/// own message are read from that error rather than from display text.
fn field_error(err: &(dyn StdError + 'static), fallback: &str) -> FieldError {
    let (path, inner) = match path_error(err) {
        Some((path, inner)) => (path, inner),
        None => (None, innermost(err).to_string()),
    };

    let message = inner
        .split(" at line ")
        .next()
        .unwrap_or(inner.as_str())
        .to_string();

    let (field, kind) = if let Some(name) = backticked(&message, "missing field ") {
        (joined(path, name), "missing")
    } else if let Some(name) = backticked(&message, "unknown field ") {
        (joined(path, name), "extra_forbidden")
    } else if message.starts_with("invalid type") {
        (path.unwrap_or_else(|| fallback.to_string()), "type_error")
    } else {
        (path.unwrap_or_else(|| fallback.to_string()), "value_error")
    };

    FieldError {
        field,
        message,
        kind,
    }
}

/// Path (None at the document root) and inner message of the first
/// `serde_path_to_error` error in the source chain
fn path_error(err: &(dyn StdError + 'static)) -> Option<(Option<String>, String)> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(e) = e.downcast_ref::<serde_path_to_error::Error<serde_json::Error>>() {
            return Some((path_of(e.path()), e.inner().to_string()));
        }
        if let Some(e) = e.downcast_ref::<serde_path_to_error::Error<serde::de::value::Error>>() {
            return Some((path_of(e.path()), e.inner().to_string()));
        }
        current = e.source();
    }
    None
}

fn path_of(path: &serde_path_to_error::Path) -> Option<String> {
    Some(path.to_string()).filter(|p| !p.is_empty() && p != ".")
}

fn innermost<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current
}

/// A missing or unknown key is reported under its own name, below the
/// path of the object that lacked it
fn joined(path: Option<String>, name: String) -> String {
    match path {
        Some(parent) => format!("{parent}.{name}"),
        None => name,
    }
}

fn backticked(message: &str, prefix: &str) -> Option<String> {
    let rest = message.strip_prefix(prefix)?.strip_prefix('`')?;
    rest.split('`').next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use axum::routing::{get, post};
    use kernel::error::envelope::ErrorReport;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
        #[allow(dead_code)]
        age: u32,
    }

    #[derive(Deserialize)]
    struct Outer {
        #[allow(dead_code)]
        inner: Payload,
    }

    #[derive(Deserialize)]
    struct Paging {
        #[allow(dead_code)]
        page: Option<i64>,
    }

    fn app() -> Router {
        Router::new()
            .route("/json", post(|ValidJson(_): ValidJson<Payload>| async { "ok" }))
            .route("/nested", post(|ValidJson(_): ValidJson<Outer>| async { "ok" }))
            .route("/query", get(|ValidQuery(_): ValidQuery<Paging>| async { "ok" }))
    }

    async fn post_json(body: &'static str, content_type: Option<&str>) -> (StatusCode, Option<ErrorReport>) {
        let mut builder = Request::builder().method("POST").uri("/json");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        let response = app()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        (response.status(), response.extensions().get::<ErrorReport>().cloned())
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let (status, report) = post_json(r#"{"name":"a","age":3}"#, Some("application/json")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(report.is_none());
    }

    #[tokio::test]
    async fn test_syntax_error_is_bad_request() {
        let (status, report) = post_json(r#"{"name":"#, Some("application/json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(report.unwrap().name, "BadRequestError");
    }

    #[tokio::test]
    async fn test_missing_field_is_validation_error() {
        let (status, report) = post_json(r#"{"name":"a"}"#, Some("application/json")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let report = report.unwrap();
        assert_eq!(report.name, "ValidationError");
        assert_eq!(report.message, VALIDATION_FAILED);
        let error = &report.details.unwrap()["errors"][0];
        assert_eq!(error["field"], "age");
        assert_eq!(error["type"], "missing");
    }

    #[tokio::test]
    async fn test_nested_errors_report_the_path() {
        let send = |body: &'static str| {
            app().oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/nested")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
        };

        let response = send(r#"{"inner":{"name":"a","age":"old"}}"#).await.unwrap();
        let report = response.extensions().get::<ErrorReport>().cloned().unwrap();
        let error = &report.details.unwrap()["errors"][0];
        assert_eq!(error["field"], "inner.age");
        assert_eq!(error["type"], "type_error");
        assert!(!error["message"].as_str().unwrap().contains("line"));

        let response = send(r#"{"inner":{"name":"a"}}"#).await.unwrap();
        let report = response.extensions().get::<ErrorReport>().cloned().unwrap();
        assert_eq!(report.details.unwrap()["errors"][0]["field"], "inner.age");
    }

    #[tokio::test]
    async fn test_oversized_body_hides_internal_text() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/json")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(vec![b' '; 3 * 1024 * 1024]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.message, BODY_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_validation_error() {
        let (status, report) = post_json(r#"{"name":"a","age":3}"#, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(report.unwrap().details.unwrap()["errors"][0]["type"], "content_type");
    }

    #[tokio::test]
    async fn test_bad_query_is_validation_error() {
        let response = app()
            .oneshot(Request::builder().uri("/query?page=abc").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.name, "ValidationError");
        assert_eq!(report.details.as_ref().unwrap()["errors"][0]["field"], "page");
    }
}
