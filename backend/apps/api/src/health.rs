//! `/health` and `/metrics`

use std::sync::Arc;

use auth::HealthCheck;
use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use kernel::error::app_error::AppError;
use platform::metrics::{CONTENT_TYPE, HttpMetrics};
use serde::Serialize;

use crate::startup::StartupReport;

pub struct HealthState<H> {
    pub store: Arc<H>,
    pub environment: String,
    pub project: String,
    pub email_configured: bool,
    pub startup: Arc<StartupReport>,
}

impl<H> Clone for HealthState<H> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            environment: self.environment.clone(),
            project: self.project.clone(),
            email_configured: self.email_configured,
            startup: self.startup.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub environment: String,
    pub project: String,
    pub database: DatabaseStatus,
    pub email_configured: bool,
    pub startup: StartupReport,
}

/// GET /health
///
/// 常に 200 を返す。DB 障害や起動時の失敗は `status: "degraded"` で表す。
pub async fn health<H: HealthCheck + Sync + Send + 'static>(
    State(state): State<HealthState<H>>,
) -> Json<HealthResponse> {
    let database = match state.store.ping().await {
        Ok(()) => DatabaseStatus {
            connected: true,
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            DatabaseStatus {
                connected: false,
                error: Some(e.to_string()),
            }
        }
    };

    let status = if database.connected && state.startup.is_healthy() {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.environment,
        project: state.project,
        database,
        email_configured: state.email_configured,
        startup: (*state.startup).clone(),
    })
}

/// GET /metrics
pub async fn metrics(State(metrics): State<Arc<HttpMetrics>>) -> Response {
    match metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => AppError::internal("Failed to encode metrics")
            .with_source(e)
            .into_response(),
    }
}
