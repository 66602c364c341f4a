//! Residia API Server
//!
//! Main entry point for the Residia backend service. Serves the HTTP API
//! and, when enabled, runs the daily billing job.

mod scheduler;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use residia_api::{AppState, create_router};
use residia_db::{BillingRepository, LedgerRepository, connect};
use residia_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "residia=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(&config.database).await?;
    info!("Connected to database");

    let state = AppState::new(
        Arc::new(BillingRepository::new(db.clone())),
        Arc::new(LedgerRepository::new(db)),
        &config.billing,
        &config.api,
    );
    if state.internal_api_key.is_none() {
        info!("No internal API key configured; billing and ledger routes are disabled");
    }

    let shutdown = CancellationToken::new();

    let scheduler = config.billing.schedule_enabled.then(|| {
        tokio::spawn(scheduler::run_daily_billing(
            state.generator(false),
            state.ledger_cache.clone(),
            config.billing.schedule_hour_utc,
            shutdown.clone(),
        ))
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Some(handle) = scheduler {
        handle.await.context("Billing scheduler panicked")?;
    }

    Ok(())
}

/// Resolves on Ctrl-C and cancels in-flight background work.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
