//! Promptly API server.

use std::sync::Arc;

use api::{app, AppState, Config};
use database::Database;
use orchestrator::{Dispatcher, OptimizationService, ProviderRegistry};
use quota_gate::{Clock, QuotaService, RateLimiter, SystemClock};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting Promptly API");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Build services
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = ProviderRegistry::from_env(config.dispatch_order.clone())?;
    info!(providers = ?registry.available(), "Provider registry ready");

    let limiter = Arc::new(RateLimiter::new(clock.clone()));
    let service = OptimizationService::new(
        limiter.clone(),
        QuotaService::new(Arc::new(db.clone())),
        Dispatcher::new(registry),
        clock.clone(),
    );
    let sweeper = limiter.spawn_sweeper(config.sweep_interval);

    if config.webhook_secret.is_none() {
        warn!("BILLING_WEBHOOK_SECRET not set, billing webhook disabled");
    }

    let state = AppState::new(
        db.clone(),
        Arc::new(service),
        clock,
        config.webhook_secret.clone(),
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "Promptly API listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown().await;
    db.close().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
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

    info!("Received shutdown signal");
}
