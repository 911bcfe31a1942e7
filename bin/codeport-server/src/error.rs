//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! **Security note:** internal errors (packaging, I/O) are logged with full
//! detail but only a generic message is returned to the caller so that
//! file paths or other implementation details never leak to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use codeport_core::{BatchError, PackageError, UploadError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// All errors that can occur in the codeport-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The upload was rejected before any conversion was attempted.
    #[error("upload rejected: {0}")]
    Upload(#[from] UploadError),

    /// The output bundle could not be written.
    #[error("packaging error: {0}")]
    Package(#[from] PackageError),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The configured bearer token was missing or wrong.
    #[error("unauthorized")]
    Unauthorized,

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BatchError> for ServerError {
    fn from(e: BatchError) -> Self {
        match e {
            BatchError::Upload(e) => ServerError::Upload(e),
            BatchError::Package(e) => ServerError::Package(e),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            // Upload problems are the caller's to fix; expose the detail.
            ServerError::Upload(e) => {
                let status = match e {
                    UploadError::TooLarge { .. } | UploadError::TooManyEntries { .. } => {
                        StatusCode::PAYLOAD_TOO_LARGE
                    }
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, e.to_string())
            }
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_owned()),

            // Internal errors: log the full detail, return a generic message.
            ServerError::Package(e) => {
                error!(error = %e, "failed to package conversion results");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to package conversion results".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        // Preserve the full chain in the logs before collapsing to a
        // generic internal error for the client.
        error!(error = ?e, "converting anyhow error to ServerError::Internal");
        ServerError::Internal(e.to_string())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
