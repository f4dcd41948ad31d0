//! HTTP gateway for the receptionist.
//!
//! Exposes the chat trigger plus health and tool listing endpoints.
//! Built on Axum.

pub mod services;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use concierge_agent::TurnResult;
use concierge_core::tool::ToolDeclaration;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use services::{ServiceError, Services, record_exchange};

type SharedState = Arc<Services>;

/// Build the Axum router with all gateway routes.
pub fn build_router(services: Services) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/chat", post(chat_handler))
        .route("/v1/tools", get(tools_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(Arc::new(services))
}

/// Start the gateway HTTP server.
pub async fn start(config: concierge_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let services = Services::from_config(&config)?;
    let app = build_router(services);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    user_id: String,
    session_id: String,
    message: String,
}

async fn chat_handler(
    State(services): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<TurnResult>, StatusCode> {
    if payload.session_id.trim().is_empty() || payload.message.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    info!(
        session_id = %payload.session_id,
        message_len = payload.message.len(),
        "Chat message received"
    );

    let result = services
        .chat(&payload.user_id, &payload.session_id, &payload.message)
        .await;
    Ok(Json(result))
}

#[derive(Serialize)]
struct ToolsResponse {
    tools: Vec<ToolDeclaration>,
}

async fn tools_handler(State(services): State<SharedState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: services.orchestrator.tools().declarations(),
    })
}
