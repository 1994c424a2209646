//! Cabinet API Server Binary
//!
//! # Usage
//!
//! ```bash
//! CABINET_DATABASE_URL=postgres://... CABINET_JWT_SECRET=... cargo run --bin cabinet-api
//! ```
//!
//! # Environment Variables
//!
//! * `CABINET_HOST` / `CABINET_PORT` - Bind address (default: 0.0.0.0:8080)
//! * `CABINET_JWT_SECRET` - JWT signing secret (required in production)
//! * `CABINET_JWT_EXPIRATION_SECS` - Token lifetime (default: 3600)
//! * `CABINET_DATABASE_URL` - PostgreSQL connection string
//! * `CABINET_LOG_LEVEL` - `EnvFilter` directive (default: info); `RUST_LOG` wins
//! * `CABINET_LOG_FORMAT` - `pretty` or `json`
//! * `CABINET_TIMEZONE` - IANA zone for due dates (default: Africa/Douala)
//! * `CABINET_CACHE_TTL_SECS` - Client listing cache lifetime (default: 30)
//! * `CABINET_REMINDER_ENDPOINT` / `CABINET_REMINDER_API_KEY` /
//!   `CABINET_REMINDER_TIMEOUT_SECS` - Notification function for reminders

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_billing::HttpReminderGateway;
use infra_db::{create_pool, DatabaseConfig, PostgresBillingAdapter, PostgresClientAdapter};
use interface_api::config::{ApiConfig, LogFormat};
use interface_api::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid CABINET_* configuration")?;

    init_tracing(&config.log_level, config.log_format);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        timezone = %config.timezone,
        "Starting cabinet API server"
    );

    // Migrations run as part of pool creation
    let pool = create_pool(DatabaseConfig::new(config.database_url.clone()).run_migrations(true))
        .await
        .context("database unavailable")?;
    tracing::info!("Database ready");

    let mut state = AppState::new(
        config.clone(),
        Arc::new(PostgresClientAdapter::new(pool.clone())),
        Arc::new(PostgresBillingAdapter::new(pool)),
    );
    match config.reminder_gateway() {
        Some(gateway_config) => {
            let gateway = HttpReminderGateway::new(gateway_config).context("reminder gateway")?;
            state = state.with_reminder_gateway(Arc::new(gateway));
        }
        None => tracing::warn!("CABINET_REMINDER_ENDPOINT not set, reminders are disabled"),
    }

    let app = create_router(state);
    let addr: SocketAddr = config.server_addr().parse().context("invalid bind address")?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber; `RUST_LOG` takes precedence over
/// the configured level
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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
