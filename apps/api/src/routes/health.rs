//! Health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /health - 503 when the database does not answer.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    if state.db.health_check().await {
        (
            StatusCode::OK,
            Json(HealthStatus {
                status: "ok",
                database: "connected",
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthStatus {
                status: "degraded",
                database: "unavailable",
            }),
        )
    }
}
