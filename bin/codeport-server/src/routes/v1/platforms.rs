//! Platform discovery route.
//!
//! The front-end enumerates supported platforms (and their recognized
//! extensions) from here instead of hardcoding them.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use codeport_core::Platform;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(list_platforms), components(schemas(PlatformInfo)))]
pub struct PlatformsApi;

/// Register platform-discovery routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/platforms", get(list_platforms))
}

/// One supported platform.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlatformInfo {
    /// Wire identifier, e.g. `"android_java"`.
    pub id: String,
    /// Human-readable label, e.g. `"Android Java"`.
    pub label: String,
    /// Recognized source-file extensions.
    pub extensions: Vec<String>,
    /// Extension given to converted logic files.
    pub converted_extension: String,
}

/// List supported platforms (`GET /v1/platforms`).
#[utoipa::path(
    get,
    path = "/v1/platforms",
    tag = "platforms",
    responses(
        (status = 200, description = "Supported platforms", body = [PlatformInfo])
    )
)]
pub async fn list_platforms() -> Json<Vec<PlatformInfo>> {
    let platforms = Platform::all()
        .into_iter()
        .map(|p| PlatformInfo {
            id: p.to_string(),
            label: p.label().to_owned(),
            extensions: p.source_extensions().iter().map(|e| (*e).to_owned()).collect(),
            converted_extension: p.code_extension().to_owned(),
        })
        .collect();
    Json(platforms)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
