//! HTTP server setup with Axum

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use super::websocket::{handler::ws_handler, state::HubState};
use crate::types::HubResult;

/// Live connection counts
#[derive(Debug, Serialize)]
pub struct HubStats {
    pub connections: usize,
    /// Subscribers per topic
    pub topics: BTreeMap<String, usize>,
}

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<HubState>) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket endpoint
        .route("/ws", get(ws_handler))
        // Health check
        .route("/health", get(health_check))
        .route("/api/hub/stats", get(hub_stats))
        .layer(cors)
        .with_state(state)
}

/// Serve the hub until `shutdown` resolves, then drain every live connection
pub async fn serve<F>(listener: TcpListener, state: Arc<HubState>, shutdown: F) -> HubResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(Arc::clone(&state));
    let drain_state = Arc::clone(&state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            let closed = drain_state.shutdown();
            tracing::info!(connections = closed, "Shutdown requested, closing WebSocket sessions");
        })
        .await?;

    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn hub_stats(State(state): State<Arc<HubState>>) -> Json<HubStats> {
    Json(HubStats {
        connections: state.registry.len(),
        topics: state.registry.topic_counts(),
    })
}
