//! Health / heartbeat endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat endpoint.
///
/// Reports the configured conversion model and whether an API credential
/// is present.  A server without one will accept uploads but every file
/// will come back as a placeholder, so monitoring wants to see
/// `"ready": true` here.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status":  "ok",
        "service": "codeport-server",
        "version": env!("CARGO_PKG_VERSION"),
        "model":   state.config.model,
        "ready":   !state.config.api_key.is_empty(),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
