//! OpenAPI document assembly for Swagger UI.

use utoipa::OpenApi;

use super::{health, v1};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "codeport-server",
        description = "Mobile source conversion service: upload Android or iOS \
                       sources, download the AI-translated counterpart.",
        version = "0.1.0",
    ),
    tags(
        (name = "conversions", description = "Source conversion uploads"),
        (name = "platforms", description = "Supported platform metadata"),
        (name = "health", description = "Service health"),
    )
)]
struct ApiDoc;

/// Complete OpenAPI document: shared info plus every route group.
pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut docs = ApiDoc::openapi();
    docs.merge(v1::api_docs());
    docs.merge(health::HealthApi::openapi());
    docs
}

// ── Tests ──────────────────────────────────────────────────────────────────────
