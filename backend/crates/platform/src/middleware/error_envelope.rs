//! Exception-to-response mapper
//!
//! Every response with status >= 400 leaves the application through here and
//! gets the same JSON body:
//!
//! ```json
//! { "error": "...", "message": "...", "status_code": 401,
//!   "timestamp": "...", "path": "/users/me", "request_id": "...", "details": {} }
//! ```
//!
//! Typed errors ([`AppError`](kernel::error::app_error::AppError)) leave an
//! [`ErrorReport`] in the response extensions. Responses without one
//! (router 404/405, extractor rejections, timeouts, panics) are classified by
//! status code.

use std::any::Any;

use axum::Json;
use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use kernel::error::envelope::ErrorReport;

use super::request_context::RequestContext;

pub async fn error_envelope(req: Request, next: Next) -> Response {
    let ctx = RequestContext::from_request(&req);
    let response = next.run(req).await;

    if response.status().as_u16() < 400 {
        return response;
    }
    render(&ctx, response)
}

fn render(ctx: &RequestContext, response: Response) -> Response {
    let (mut parts, _body) = response.into_parts();

    let report = parts
        .extensions
        .remove::<ErrorReport>()
        .unwrap_or_else(|| ErrorReport::from_status(parts.status, &ctx.method, &ctx.path))
        .sanitized();

    if report.status_code >= 500 {
        tracing::error!(
            path = %ctx.path,
            method = %ctx.method,
            request_id = ctx.request_id_or_dash(),
            status = report.status_code,
            error = %report.name,
            "{}",
            report.message
        );
    } else {
        tracing::warn!(
            path = %ctx.path,
            method = %ctx.method,
            request_id = ctx.request_id_or_dash(),
            status = report.status_code,
            error = %report.name,
            "{}",
            report.message
        );
    }

    let status =
        StatusCode::from_u16(report.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let envelope = report.into_envelope(&ctx.path, ctx.request_id.clone());

    let mut rendered = (status, Json(envelope)).into_response();
    // Keep Retry-After, X-RateLimit-*, Allow and friends
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rendered.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rendered
}

/// Handler for tower-http's `CatchPanicLayer::custom`
///
/// The panic payload is logged, never returned.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "Handler panicked");

    let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
    response.extensions_mut().insert(ErrorReport::unexpected());
    response
}
