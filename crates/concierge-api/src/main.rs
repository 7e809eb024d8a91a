//! # concierge-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the case lifecycle API.
//! Binds to the configured port (default 8080).

use concierge_api::state::{AppConfig, AppState, LogFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    // Initialize structured tracing.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let prometheus = if config.metrics_enabled {
        let handle = concierge_api::middleware::metrics::install_recorder().map_err(|e| {
            tracing::error!("Prometheus recorder installation failed: {e}");
            e
        })?;
        Some(handle)
    } else {
        tracing::info!("metrics disabled");
        None
    };

    tracing::info!(?config, "configuration loaded");
    let port = config.port;
    let app = concierge_api::app(AppState::with_config(config, prometheus));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Concierge API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
