//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod app;
mod config;
mod health;
mod startup;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use auth::{AuthAppState, BootstrapSuperadmin, PgAuthRepository};
use chrono::Utc;
use platform::email::{EmailQueue, EmailWorker};
use platform::metrics::HttpMetrics;
use platform::middleware::RateLimitState;
use platform::rate_limit::InMemoryRateLimitStore;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use crate::app::{AppDeps, build_router};
use crate::config::AppConfig;
use crate::health::HealthState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    telemetry::init(config.log_format);

    tracing::info!(
        environment = %config.environment,
        project = %config.project_name(),
        "Starting server"
    );

    // Lazy pool: an unreachable database degrades the server instead of
    // preventing it from starting
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(&config.database_url)?;
    let repo = Arc::new(PgAuthRepository::new(pool.clone()));

    let mut report = startup::run_checks(&config, repo.as_ref()).await;

    match sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await
    {
        Ok(()) => tracing::info!("Migrations completed"),
        Err(e) => report.critical(format!("Database migrations failed: {e}")),
    }

    if config.startup_fail_fast && !report.is_healthy() {
        anyhow::bail!(
            "Startup checks failed: {}",
            report.critical_failures.join("; ")
        );
    }

    // Startup cleanup: errors here should not prevent server startup
    match repo.purge_expired_reset_tokens().await {
        Ok(deleted) => tracing::info!(tokens_deleted = deleted, "Reset token cleanup completed"),
        Err(e) => tracing::warn!(error = %e, "Reset token cleanup failed, continuing anyway"),
    }

    let (mailer, outbox) = EmailQueue::channel();
    EmailWorker::spawn(config.email.clone(), outbox);

    let auth_state = AuthAppState::new(repo.clone(), config.auth.clone(), mailer)?;

    if let Some(admin) = config.bootstrap_admin.clone() {
        match BootstrapSuperadmin::new(repo.clone(), auth_state.hasher)
            .execute(admin)
            .await
        {
            Ok(Some(admin)) => tracing::info!(admin_id = %admin.id, "Superadmin bootstrapped"),
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "Superadmin bootstrap failed"),
        }
    }

    let rate_limit_store = Arc::new(InMemoryRateLimitStore::new());
    spawn_rate_limit_sweeper(rate_limit_store.clone(), config.rate_limit.window);

    let app = build_router(AppDeps {
        rate_limit: RateLimitState::new(
            rate_limit_store,
            config.rate_limit.clone(),
            Some(auth_state.tokens.codec()),
        ),
        auth: auth_state,
        health: HealthState {
            store: repo,
            environment: config.environment.clone(),
            project: config.project_name().to_string(),
            email_configured: config.email_configured(),
            startup: Arc::new(report),
        },
        metrics: Arc::new(HttpMetrics::new()?),
        cors_origins: config.cors_origins.clone(),
        request_timeout: config.request_timeout,
    });

    // Start server
    let addr = config.addr();
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Drop finished rate limit windows once per window
fn spawn_rate_limit_sweeper(store: Arc<InMemoryRateLimitStore>, window: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(window.max(Duration::from_secs(1)));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.purge_expired(window, Utc::now().timestamp_millis());
            if removed > 0 {
                tracing::debug!(removed, "Rate limit windows purged");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
