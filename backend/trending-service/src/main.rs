use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trending_service::{Config, PgCatalogStore, TrendingService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration; logging is not up yet, errors surface through main's Result
    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    config
        .validate_database()
        .context("Database configuration validation failed")?;

    // Initialize structured logging, RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_thread_names(true)
                .with_target(true),
        )
        .init();

    info!(
        refresh_interval_secs = config.refresh_interval_seconds,
        failure_backoff_secs = config.failure_backoff_seconds,
        log_level = %config.log_level,
        "Starting trending-service"
    );

    let store = PgCatalogStore::connect(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to create PostgreSQL pool")?;
    info!("Catalog store connected");

    let service = TrendingService::new(Arc::new(store), &config);
    service.start_scheduler().await;

    shutdown_signal().await;
    info!("Shutdown signal received, stopping trending scheduler");

    service.stop_scheduler().await;
    info!("trending-service stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
