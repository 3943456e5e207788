//! Receivables API Server Binary
//!
//! Starts the HTTP API: invoice endpoints for users and the reminder run
//! trigger for the external scheduler.
//!
//! # Usage
//!
//! ```bash
//! API_DATABASE_URL=postgres://... API_CRON_SECRET=... cargo run --bin receivables-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` / `API_PORT` - Listen address (default: 0.0.0.0:8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_CRON_SECRET` - Bearer secret for `/api/cron/check-reminders`; unset disables runs
//! * `API_BATCH_LIMIT` / `API_MAX_CONCURRENCY` - Run sizing (default: 100 / 4)
//! * `API_PROVIDERS__RESEND_API_KEY`, `API_PROVIDERS__TWILIO__ACCOUNT_SID`, ... -
//!   System-wide provider credentials
//! * `API_LOG_LEVEL` - Log level used when `RUST_LOG` is unset (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::SystemClock;
use infra_db::{create_pool, run_migrations, DatabaseConfig, PgBillingStore};
use interface_api::{config::ApiConfig, create_router, AppState, Providers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("loading configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        batch_limit = config.batch_limit,
        cron_enabled = !config.cron_secret.is_empty(),
        "Starting receivables API server"
    );

    let pool = create_pool(DatabaseConfig::new(&config.database_url))
        .await
        .context("connecting to database")?;
    run_migrations(&pool).await.context("running migrations")?;

    let providers = Providers::http(config.provider_timeout()).context("building HTTP client")?;
    let store = Arc::new(PgBillingStore::new(pool));
    let addr: SocketAddr = config.server_addr().parse().context("parsing listen address")?;

    let state = AppState::build(store, config, Arc::new(SystemClock), providers);
    let app = create_router(state);

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
