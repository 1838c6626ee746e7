//! Rate limit middleware
//!
//! Keyed by `user:{id}:{role}` when a valid bearer token is presented,
//! otherwise by `ip:{address}`. The token is only decoded here, never looked
//! up in storage.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use kernel::error::app_error::AppError;
use serde::Deserialize;

use crate::client::{bearer_token, extract_client_ip};
use crate::rate_limit::{RateLimitConfig, RateLimitResult, RateLimitStore};
use crate::token::TokenCodec;

/// Paths never counted
pub const EXEMPT_PATHS: &[&str] = &["/health", "/metrics"];

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// State for [`rate_limit`]
pub struct RateLimitState<S> {
    pub store: Arc<S>,
    pub config: RateLimitConfig,
    pub codec: Option<Arc<TokenCodec>>,
}

impl<S> Clone for RateLimitState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl<S> RateLimitState<S> {
    pub fn new(store: Arc<S>, config: RateLimitConfig, codec: Option<Arc<TokenCodec>>) -> Self {
        Self {
            store,
            config,
            codec,
        }
    }
}

#[derive(Deserialize)]
struct Subject {
    id: i64,
    role: String,
}

/// Client identity used as the counter key
pub fn client_key(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    codec: Option<&TokenCodec>,
) -> String {
    if let (Some(codec), Some(token)) = (codec, bearer_token(headers)) {
        if let Ok(subject) = codec.decode::<Subject>(token) {
            return format!("user:{}:{}", subject.id, subject.role);
        }
    }

    match extract_client_ip(headers, peer.map(|addr| addr.ip())) {
        Some(ip) => format!("ip:{ip}"),
        None => "ip:unknown".to_string(),
    }
}

pub async fn rate_limit<S>(
    State(state): State<RateLimitState<S>>,
    req: Request,
    next: Next,
) -> Response
where
    S: RateLimitStore + Send + Sync + 'static,
{
    if EXEMPT_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let key = client_key(req.headers(), peer, state.codec.as_deref());

    let result = match state.store.check_and_increment(&key, &state.config).await {
        Ok(result) => result,
        Err(e) => {
            // Counter backend failures never block traffic
            tracing::error!(error = %e, key = %key, "Rate limit store failed");
            return next.run(req).await;
        }
    };

    if !result.allowed {
        tracing::warn!(
            key = %key,
            path = %req.uri().path(),
            retry_after = result.retry_after_secs,
            "Rate limit exceeded"
        );
        let mut response = AppError::rate_limit(result.retry_after_secs).into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(result.retry_after_secs));
        set_quota_headers(response.headers_mut(), &state.config, &result);
        return response;
    }

    let mut response = next.run(req).await;
    set_quota_headers(response.headers_mut(), &state.config, &result);
    response
}

fn set_quota_headers(headers: &mut HeaderMap, config: &RateLimitConfig, result: &RateLimitResult) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(config.max_requests));
    headers.insert(REMAINING_HEADER, HeaderValue::from(result.remaining));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::InMemoryRateLimitStore;
    use axum::Router;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;
    use chrono::Duration;
    use serde::Serialize;
    use tower::ServiceExt;

    #[derive(Serialize)]
    struct Claims {
        id: i64,
        role: &'static str,
    }

    fn app(max_requests: u32, codec: Option<Arc<TokenCodec>>) -> Router {
        let state = RateLimitState::new(
            Arc::new(InMemoryRateLimitStore::new()),
            RateLimitConfig::new(max_requests, 60),
            codec,
        );
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .route("/health", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                state,
                rate_limit::<InMemoryRateLimitStore>,
            ))
    }

    fn get_req(uri: &str, ip: &str) -> Request {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_quota_headers_and_limit() {
        let app = app(2, None);

        let first = app.clone().oneshot(get_req("/ping", "1.1.1.1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()[LIMIT_HEADER], "2");
        assert_eq!(first.headers()[REMAINING_HEADER], "1");

        app.clone().oneshot(get_req("/ping", "1.1.1.1")).await.unwrap();
        let third = app.clone().oneshot(get_req("/ping", "1.1.1.1")).await.unwrap();
        assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(third.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(third.headers()[REMAINING_HEADER], "0");

        let other_client = app.oneshot(get_req("/ping", "2.2.2.2")).await.unwrap();
        assert_eq!(other_client.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_exempt_paths() {
        let app = app(1, None);
        for _ in 0..3 {
            let response = app.clone().oneshot(get_req("/health", "1.1.1.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(!response.headers().contains_key(LIMIT_HEADER));
        }
    }

    #[test]
    fn test_client_key_prefers_subject() {
        let codec = TokenCodec::new("rate-limit-test-secret").unwrap();
        let token = codec
            .issue(&Claims { id: 7, role: "user" }, Duration::minutes(5))
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_key(&headers, None, Some(&codec)), "ip:9.9.9.9");

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(client_key(&headers, None, Some(&codec)), "user:7:user");

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer garbage"));
        assert_eq!(client_key(&headers, None, Some(&codec)), "ip:9.9.9.9");
    }

    #[test]
    fn test_client_key_peer_fallback() {
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(client_key(&HeaderMap::new(), Some(peer), None), "ip:127.0.0.1");
        assert_eq!(client_key(&HeaderMap::new(), None, None), "ip:unknown");
    }
}
