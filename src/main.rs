//! # ARX-RING Configuration Server Entry Point
//!
//! Starts the configuration pages on the device's access point network.
//!
//! The application can be launched with optional command-line arguments:
//!
//! - First argument: Port number (defaults to 80)
//! - Second argument: Path to the configuration file (defaults to "wifi_config.json")
//!
//! ## Example Usage
//!
//! ```bash
//! # Run with default settings (port 80, default config)
//! cargo run
//!
//! # Run with a specific port and configuration file
//! cargo run 8080 /data/wifi_config.json
//! ```
//!
//! Log levels can be controlled through the `RUST_LOG` environment variable.

use arx_ring::config::ConfigStore;
use arx_ring::display::LogDisplay;
use arx_ring::error::ArxRingError;
use arx_ring::server::{self, Portal, ServerSettings};
use arx_ring::wifi::NmcliWifi;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), ArxRingError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut settings = ServerSettings::default();

    if let Some(port) = env::args().nth(1).and_then(|s| s.parse().ok()) {
        settings.port = port;
    }
    if let Some(path) = env::args().nth(2) {
        settings.config_path = PathBuf::from(path);
    }

    tracing::info!("Starting ARX-RING configuration server");

    let store = Arc::new(ConfigStore::new(settings.config_path.clone()));
    let portal = Portal::new(
        Arc::clone(&store),
        NmcliWifi::new(Arc::clone(&store)),
        LogDisplay::new(store),
    );

    let cancel_token = CancellationToken::new();
    let shutdown = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {e}");
            return;
        }
        shutdown.cancel();
    });

    server::run(settings, portal, cancel_token).await?;

    tracing::info!("ARX-RING configuration server shutting down");
    Ok(())
}
