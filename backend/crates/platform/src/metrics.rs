//! HTTP metrics
//!
//! Prometheus collectors kept in a private [`Registry`] owned by the
//! application state, so independent routers (and tests) never share
//! counters.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

/// Content type of the text exposition format
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Request counters, latency histogram and in-flight gauge
#[derive(Clone)]
pub struct HttpMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    in_progress: IntGaugeVec,
    errors_total: IntCounterVec,
}

impl std::fmt::Debug for HttpMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMetrics").finish_non_exhaustive()
    }
}

impl HttpMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "endpoint"],
        )?;
        let in_progress = IntGaugeVec::new(
            Opts::new(
                "http_requests_in_progress",
                "Number of HTTP requests currently being processed",
            ),
            &["method", "endpoint"],
        )?;
        let errors_total = IntCounterVec::new(
            Opts::new("http_errors_total", "Total number of HTTP error responses"),
            &["method", "endpoint", "error_type"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(in_progress.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            in_progress,
            errors_total,
        })
    }

    /// Mark a request as started. Pair with [`finish`](Self::finish).
    pub fn start(&self, method: &str, endpoint: &str) {
        self.in_progress.with_label_values(&[method, endpoint]).inc();
    }

    /// Record a completed request
    pub fn finish(&self, method: &str, endpoint: &str, status: u16, elapsed_secs: f64) {
        self.in_progress.with_label_values(&[method, endpoint]).dec();
        let status_label = status.to_string();
        self.requests_total
            .with_label_values(&[method, endpoint, status_label.as_str()])
            .inc();
        self.request_duration
            .with_label_values(&[method, endpoint])
            .observe(elapsed_secs);

        if let Some(error_type) = error_type(status) {
            self.errors_total
                .with_label_values(&[method, endpoint, error_type])
                .inc();
        }
    }

    /// Text exposition of every collector
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn error_type(status: u16) -> Option<&'static str> {
    match status {
        400..=499 => Some("client_error"),
        500.. => Some("server_error"),
        _ => None,
    }
}
