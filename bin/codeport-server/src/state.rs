//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use codeport_core::Translator;

use crate::config::Config;

/// State shared across all HTTP handlers.
///
/// The translator sits behind a trait object so tests can swap in a mock
/// without touching the routing layer.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived, immutable).
    pub config: Arc<Config>,
    /// External AI service client.
    pub translator: Arc<dyn Translator>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("translator", &"dyn Translator")
            .finish()
    }
}
