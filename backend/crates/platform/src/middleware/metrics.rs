//! Request metrics middleware

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::metrics::HttpMetrics;

/// Label for requests that matched no route
const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Record count, latency and in-flight gauge per route template
///
/// The endpoint label is the matched template (`/users/{id}`), never the raw
/// path, to keep label cardinality bounded.
pub async fn track_metrics(
    State(metrics): State<Arc<HttpMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_owned());

    let start = Instant::now();
    metrics.start(&method, &endpoint);
    let response = next.run(req).await;
    metrics.finish(
        &method,
        &endpoint,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_requests_are_labelled_by_template() {
        let metrics = Arc::new(HttpMetrics::new().unwrap());
        let app = Router::new()
            .route("/items/{id}", get(|| async { "item" }))
            .layer(axum::middleware::from_fn_with_state(
                metrics.clone(),
                track_metrics,
            ));

        app.oneshot(Request::builder().uri("/items/17").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"endpoint="/items/{id}""#));
        assert!(!text.contains("/items/17"));
    }
}
