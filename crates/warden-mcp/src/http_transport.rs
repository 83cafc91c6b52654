//! HTTP transport for the MCP server.
//!
//! JSON-RPC requests arrive as `POST /mcp`; `GET /health` answers liveness
//! probes.

use crate::error::McpError;
use crate::protocol::JsonRpcRequest;
use crate::server::McpServer;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the HTTP router for MCP.
pub fn create_router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp_post))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn handle_mcp_post(
    State(server): State<Arc<McpServer>>,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    match server.handle_message(request).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "warden",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Bind to the configured address and serve until the process exits.
pub async fn serve(server: Arc<McpServer>) -> Result<(), McpError> {
    let addr = format!("{}:{}", server.config().host, server.config().port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| McpError::Startup(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!(addr = %addr, "MCP HTTP server listening");

    axum::serve(listener, create_router(server))
        .await
        .map_err(|e| McpError::Transport(e.to_string()))
}
