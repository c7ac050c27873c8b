//! # lm-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the license manager.
//! Binds to the configured port (default 8080).

use lm_api::state::{AppConfig, AppState};
use lm_notify::TracingMailer;
use metrics_exporter_prometheus::PrometheusBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {e}");
        e
    })?;
    let port = config.port;
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set; authentication is disabled");
    }

    let state = AppState::bootstrap(config).map_err(|e| {
        tracing::error!("Bootstrap failed: {e}");
        e
    })?;

    let handle = PrometheusBuilder::new().install_recorder()?;
    let state = state.with_metrics(handle).with_mailer(TracingMailer);

    let app = lm_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("License manager API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
