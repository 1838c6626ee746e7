//! Request context
//!
//! The request id itself is generated by tower-http's `SetRequestIdLayer`;
//! this only collects it together with the method and path.

use axum::extract::Request;
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request facts used by logs and error envelopes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: Option<String>,
    pub method: Method,
    pub path: String,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>, headers: &HeaderMap) -> Self {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        Self {
            request_id,
            method,
            path: path.into(),
        }
    }

    pub fn from_request(req: &Request) -> Self {
        Self::new(req.method().clone(), req.uri().path(), req.headers())
    }

    /// Request id or `-` for log fields
    pub fn request_id_or_dash(&self) -> &str {
        self.request_id.as_deref().unwrap_or("-")
    }
}

/// Store [`RequestContext`] in the request extensions
pub async fn request_context(mut req: Request, next: Next) -> Response {
    let ctx = RequestContext::from_request(&req);
    req.extensions_mut().insert(ctx);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    #[test]
    fn test_context_reads_request_id() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/users/login?x=1")
            .header(REQUEST_ID_HEADER, HeaderValue::from_static("abc-123"))
            .body(Body::empty())
            .unwrap();

        let ctx = RequestContext::from_request(&req);
        assert_eq!(ctx.request_id.as_deref(), Some("abc-123"));
        assert_eq!(ctx.path, "/users/login");
        assert_eq!(ctx.method, Method::POST);
    }

    #[test]
    fn test_context_without_request_id() {
        let ctx = RequestContext::new(Method::GET, "/", &HeaderMap::new());
        assert_eq!(ctx.request_id, None);
        assert_eq!(ctx.request_id_or_dash(), "-");
    }
}
