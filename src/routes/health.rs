use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    database: String,
}

/// Lightweight liveness probe; no database access.
async fn root_health() -> impl IntoResponse {
    StatusCode::OK
}

/// Detailed health check including database connectivity.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = match state.db.ping().await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status.to_string(),
    };

    (StatusCode::OK, Json(response))
}

/// `GET /health`
pub fn root_router() -> Router<AppState> {
    Router::new().route("/health", get(root_health))
}

/// `GET /api/v1/health`
pub fn api_router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
