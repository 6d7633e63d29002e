//! Pinmap Hub - Binary Entry Point
//!
//! Serves the `/ws` broadcast endpoint until Ctrl-C, then closes every session.

use std::sync::Arc;

use tokio::net::TcpListener;

use pinmap_hub::config::HubConfig;
use pinmap_hub::types::HubResult;
use pinmap_hub::utils::init_logging;
use pinmap_hub::{serve, HubState};

#[tokio::main]
async fn main() -> HubResult<()> {
    let config = HubConfig::from_env()?;
    init_logging(&config);

    tracing::info!("{} v{} starting", pinmap_hub::NAME, pinmap_hub::VERSION);

    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    let state = Arc::new(HubState::new(config));
    serve(listener, state, shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
