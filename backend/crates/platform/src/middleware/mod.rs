//! HTTP middleware shared by every router
//!
//! All of them are plain `axum::middleware::from_fn` functions. The api crate
//! decides the order.

pub mod error_envelope;
pub mod metrics;
pub mod rate_limit;
pub mod request_context;
pub mod security_headers;

pub use error_envelope::{error_envelope, panic_response};
pub use metrics::track_metrics;
pub use rate_limit::{RateLimitState, rate_limit};
pub use request_context::{REQUEST_ID_HEADER, RequestContext, request_context};
pub use security_headers::security_headers;
