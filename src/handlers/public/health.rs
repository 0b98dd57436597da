use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::app::AppState;
use crate::middleware::ApiResponse;

/// GET / - service identification
pub async fn root() -> impl IntoResponse {
    ApiResponse::success(json!({
        "name": "Iris API (Rust)",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health (public)",
            "rackspace": "/webhooks/rackspace?application=<app>&key=<key> (application key)",
        }
    }))
}

/// GET /health - database connectivity probe
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.sessions.ping().await {
        Ok(()) => ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "ok"
        })),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            ApiResponse::with_status(
                json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": "unavailable"
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}
