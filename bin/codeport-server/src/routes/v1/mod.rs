//! Version-1 API surface.

pub mod conversions;
pub mod platforms;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::Router;
use utoipa::openapi::OpenApi;

use crate::middleware::auth::require_api_token;
use crate::state::AppState;

/// All `/v1` routes, guarded by the optional bearer-token check.
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(conversions::router())
        .merge(platforms::router())
        .layer(from_fn_with_state(state, require_api_token))
}

/// Merged OpenAPI document for the v1 routes.
pub fn api_docs() -> OpenApi {
    use utoipa::OpenApi as _;
    let mut docs = conversions::ConversionsApi::openapi();
    docs.merge(platforms::PlatformsApi::openapi());
    docs
}
