//! Optional bearer-token guard for the conversion routes.
//!
//! When `CODEPORT_API_TOKEN` is unset the guard is a no-op, which keeps
//! local development friction-free.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ServerError;
use crate::state::AppState;

pub async fn require_api_token(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(expected) = state.config.api_token.as_deref() {
        let provided = req
            .headers()
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match provided {
            Some(token) if token == expected => {}
            _ => return ServerError::Unauthorized.into_response(),
        }
    }
    next.run(req).await
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::test_config;
    use axum::routing::get;
    use axum::Router;
    use codeport_core::{error::TranslateError, Translator};
    use http::StatusCode;
    use tower::ServiceExt;

    struct NullTranslator;

    #[async_trait::async_trait]
    impl Translator for NullTranslator {
        async fn translate(&self, _s: &str, _u: &str) -> Result<String, TranslateError> {
            Ok(String::new())
        }
    }

    fn app(token: Option<&str>) -> Router {
        let mut cfg = test_config();
        cfg.api_token = token.map(str::to_owned);
        let state = Arc::new(AppState {
            config: Arc::new(cfg),
            translator: Arc::new(NullTranslator),
        });
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(axum::middleware::from_fn_with_state(state.clone(), require_api_token))
            .with_state(state)
    }

    async fn status_for(app: Router, auth: Option<&str>) -> StatusCode {
        let mut builder = http::Request::builder().uri("/ping");
        if let Some(value) = auth {
            builder = builder.header(http::header::AUTHORIZATION, value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        response.status()
    }

    #[tokio::test]
    async fn open_when_no_token_configured() {
        assert_eq!(status_for(app(None), None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_missing_or_wrong_token() {
        assert_eq!(status_for(app(Some("s3cret")), None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(app(Some("s3cret")), Some("Bearer nope")).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn accepts_correct_token() {
        assert_eq!(
            status_for(app(Some("s3cret")), Some("Bearer s3cret")).await,
            StatusCode::OK
        );
    }
}
