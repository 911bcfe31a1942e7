//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `CODEPORT_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - Conversion `/v1` routes (optionally protected by bearer token)

pub mod doc;
mod health;
mod v1;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(health::router())
        .nest("/v1", v1::router(state.clone()));

    let mut app = Router::new().merge(api_router);

    // ── Swagger UI ────────────────────────────────────────────────────────────
    // Enabled by default; disable with CODEPORT_ENABLE_SWAGGER=false in
    // production to avoid exposing the API structure to potential attackers.
    let api_doc = doc::get_docs();

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_doc));
    }

    // Axum's default body cap is 2 MiB; raise it above the configured upload
    // limit (plus slack for multipart framing) and let the handler enforce
    // the exact cumulative limit with a proper 413.
    let body_limit = state.config.max_upload_bytes().saturating_add(1024 * 1024) as usize;

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn(trace::trace_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
