//! CORS layer for browser-based upload clients.
//!
//! The download headers (`Content-Disposition` and the conversion
//! counters) must be explicitly exposed or cross-origin JavaScript cannot
//! read the suggested filename.

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::state::AppState;

const EXPOSED_HEADERS: [HeaderName; 3] = [
    header::CONTENT_DISPOSITION,
    HeaderName::from_static("x-conversion-total"),
    HeaderName::from_static("x-conversion-failed"),
];

pub fn cors_layer(state: Arc<AppState>) -> CorsLayer {
    // Wildcard unless CODEPORT_CORS_ORIGINS restricts the origin list;
    // production deployments should always set it.
    let origin = match parsed_origins(state.config.cors_allowed_origins.as_deref()) {
        Some(origins) => AllowOrigin::list(origins),
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers(EXPOSED_HEADERS)
}

/// Parse the comma-separated origin list; `None` when unset or when no
/// entry parses as a header value.
fn parsed_origins(raw: Option<&str>) -> Option<Vec<HeaderValue>> {
    let origins: Vec<HeaderValue> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    if origins.is_empty() { None } else { Some(origins) }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
