//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use codeport_core::{ExtractLimits, RetryPolicy};

/// Runtime configuration for codeport-server.
///
/// Every field has a default so the server starts without any environment
/// variables set (the AI key excepted: conversions fail politely until
/// one is provided).  Read once in `main`, then shared immutably through
/// `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// Base URL of the OpenAI-compatible completion API
    /// (default: `"https://api.openai.com/v1"`).
    pub api_base_url: String,

    /// API credential.  `CODEPORT_API_KEY` wins; plain `OPENAI_API_KEY`
    /// is honored as a fallback.
    pub api_key: String,

    /// Completion model identifier (default: `"gpt-4o"`).
    pub model: String,

    /// Hard per-call timeout for each external AI request, in seconds.
    pub request_timeout_secs: u64,

    /// Attempts per file before falling back to a placeholder.
    pub retry_attempts: u32,

    /// Initial backoff between retries, in seconds (doubles per attempt).
    pub retry_backoff_secs: u64,

    /// Maximum upload / decompressed-archive size, in megabytes.
    pub max_upload_mb: u64,

    /// Maximum number of entries accepted in an uploaded archive.
    pub max_archive_entries: usize,

    /// Directory for spooled archive uploads; system temp when unset.
    /// Spool space is released when the request finishes, on every path.
    pub spool_dir: Option<String>,

    /// Optional bearer token protecting the conversion routes.
    /// Unset means the API is open (development default).
    pub api_token: Option<String>,

    /// Comma-separated CORS origin allow-list; unset means wildcard.
    pub cors_allowed_origins: Option<String>,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Serve Swagger UI at `/swagger-ui` (disable in production).
    pub enable_swagger: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("CODEPORT_BIND", "0.0.0.0:3000"),
            api_base_url: env_or("CODEPORT_API_BASE_URL", "https://api.openai.com/v1"),
            api_key: std::env::var("CODEPORT_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .unwrap_or_default(),
            model: env_or("CODEPORT_MODEL", "gpt-4o"),
            request_timeout_secs: parse_env("CODEPORT_REQUEST_TIMEOUT_SECS", 60),
            retry_attempts: parse_env("CODEPORT_RETRY_ATTEMPTS", 3),
            retry_backoff_secs: parse_env("CODEPORT_RETRY_BACKOFF_SECS", 2),
            max_upload_mb: parse_env("CODEPORT_MAX_UPLOAD_MB", 50),
            max_archive_entries: parse_env("CODEPORT_MAX_ARCHIVE_ENTRIES", 2000),
            spool_dir: std::env::var("CODEPORT_SPOOL_DIR").ok().filter(|d| !d.is_empty()),
            api_token: std::env::var("CODEPORT_API_TOKEN").ok().filter(|t| !t.is_empty()),
            cors_allowed_origins: std::env::var("CODEPORT_CORS_ORIGINS").ok(),
            log_level: env_or("CODEPORT_LOG", "info"),
            log_json: std::env::var("CODEPORT_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            enable_swagger: std::env::var("CODEPORT_ENABLE_SWAGGER")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn extract_limits(&self) -> ExtractLimits {
        ExtractLimits {
            max_total_bytes: self.max_upload_bytes(),
            max_entries: self.max_archive_entries,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.max(1),
            initial_backoff: Duration::from_secs(self.retry_backoff_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// A config with test-friendly defaults, avoiding env coupling.
#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".into(),
        api_base_url: "http://localhost:9".into(),
        api_key: String::new(),
        model: "gpt-4o".into(),
        request_timeout_secs: 5,
        retry_attempts: 2,
        retry_backoff_secs: 0,
        max_upload_mb: 50,
        max_archive_entries: 2000,
        spool_dir: None,
        api_token: None,
        cors_allowed_origins: None,
        log_level: "info".into(),
        log_json: false,
        enable_swagger: false,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
