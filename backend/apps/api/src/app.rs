//! Router assembly
//!
//! Layers are listed innermost first: the last `.layer()` call wraps
//! everything above it.

use std::sync::Arc;
use std::time::Duration;

use auth::{AuthAppState, AuthStore, auth_routes};
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;
use platform::metrics::HttpMetrics;
use platform::middleware::{
    REQUEST_ID_HEADER, RateLimitState, error_envelope, panic_response, rate_limit,
    request_context, security_headers, track_metrics,
};
use platform::rate_limit::InMemoryRateLimitStore;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::health::{self, HealthState};

/// Everything [`build_router`] wires together
pub struct AppDeps<R: AuthStore> {
    pub auth: AuthAppState<R>,
    pub health: HealthState<R>,
    pub metrics: Arc<HttpMetrics>,
    pub rate_limit: RateLimitState<InMemoryRateLimitStore>,
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
}

pub fn build_router<R: AuthStore>(deps: AppDeps<R>) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health::<R>))
        .with_state(deps.health);

    let metrics_routes = Router::new()
        .route("/metrics", get(health::metrics))
        .with_state(deps.metrics.clone());

    Router::new()
        .merge(auth_routes(deps.auth))
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(from_fn_with_state(
            deps.rate_limit,
            rate_limit::<InMemoryRateLimitStore>,
        ))
        .layer(from_fn(request_context))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            deps.request_timeout,
        ))
        .layer(from_fn(error_envelope))
        .layer(from_fn_with_state(deps.metrics, track_metrics))
        .layer(from_fn(security_headers))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request| {
                let request_id = req
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(cors_layer(&deps.cors_origins))
        // Outside CORS so preflight answers carry the request id too
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// `*` allows any origin without credentials. Anything else is an explicit
/// allow list with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(allowed).allow_credentials(true)
}
