//! Startup checks
//!
//! Critical failures abort only with `STARTUP_FAIL_FAST=true`. Otherwise the
//! server comes up degraded and the failures are reported on `/health`.

use auth::HealthCheck;
use auth::application::config::MIN_SECRET_LENGTH;
use serde::Serialize;

use crate::config::AppConfig;

/// Outcome of [`run_checks`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct StartupReport {
    pub critical_failures: Vec<String>,
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl StartupReport {
    pub fn is_healthy(&self) -> bool {
        self.critical_failures.is_empty()
    }

    pub fn critical(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(check = %message, "Critical startup check failed");
        self.critical_failures.push(message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(check = %message, "Startup warning");
        self.warnings.push(message);
    }
}

pub async fn run_checks<H: HealthCheck + Sync>(config: &AppConfig, store: &H) -> StartupReport {
    let mut report = StartupReport::default();

    if !config.auth.secret_is_strong() {
        report.critical(format!(
            "SECRET_KEY must be at least {MIN_SECRET_LENGTH} characters"
        ));
    }

    if let Err(e) = store.ping().await {
        report.critical(format!("Database is unreachable: {e}"));
    }

    if !config.email_configured() {
        report.warn("SMTP_HOST is not set; outgoing email will be dropped");
    }

    let access_minutes = config.auth.access_token_ttl.num_minutes();
    if access_minutes < 5 {
        report.warn(format!(
            "ACCESS_TOKEN_EXPIRE_MINUTES={access_minutes} is shorter than 5 minutes"
        ));
    } else if access_minutes > 60 {
        report.warn(format!(
            "ACCESS_TOKEN_EXPIRE_MINUTES={access_minutes} is longer than 60 minutes"
        ));
    }

    if config.cors_origins.iter().any(|origin| origin == "*") {
        report.warn("CORS_ORIGINS allows any origin");
    }

    if report.is_healthy() {
        tracing::info!(warnings = report.warnings.len(), "Startup checks passed");
    }

    report
}
