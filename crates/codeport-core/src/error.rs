//! Error taxonomy for the conversion pipeline.
//!
//! Three families, matching the three phases a request can fail in:
//!
//! - [`UploadError`]: the upload itself is unusable; reported immediately,
//!   no conversion is attempted.
//! - [`TranslateError`]: one external-service call failed; recovered per
//!   file via retry-then-placeholder and never aborts the batch.
//! - [`PackageError`]: the output bundle could not be written; terminal.

use thiserror::Error;

/// Errors raised while extracting and filtering an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The uploaded archive could not be opened or read.
    #[error("invalid ZIP archive: {0}")]
    BadArchive(#[from] zip::result::ZipError),

    /// An archive entry name escapes the archive root (`../` or absolute).
    #[error("unsafe archive entry name: {0}")]
    UnsafePath(String),

    /// Total decompressed size exceeds the configured limit.
    #[error("archive too large: {actual} bytes exceeds the {limit} byte limit")]
    TooLarge { actual: u64, limit: u64 },

    /// Entry count exceeds the configured limit.
    #[error("too many archive entries: {actual} exceeds the limit of {limit}")]
    TooManyEntries { actual: usize, limit: usize },

    /// A single uploaded file has an extension the platform does not recognize.
    #[error("unsupported file extension for {platform}: {file}")]
    UnsupportedExtension { platform: String, file: String },

    /// Filtering left nothing to convert.
    #[error("no eligible source files found for the selected platform and conversion type")]
    NoEligibleFiles,

    /// A filesystem I/O error occurred while spooling or extracting.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a single external AI service call.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The call exceeded the per-call timeout.
    #[error("translation request timed out")]
    Timeout,

    /// The service returned HTTP 429.
    #[error("translation service rate limit exceeded")]
    RateLimited,

    /// The account quota is exhausted (the service said so explicitly).
    #[error("translation service quota exhausted")]
    QuotaExceeded,

    /// 5xx-class response from the service.
    #[error("translation service error (HTTP {status})")]
    Server { status: u16 },

    /// Any other non-success response.
    #[error("translation service rejected the request (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered 200 but with no usable completion text.
    #[error("translation service returned an empty completion")]
    EmptyResponse,

    /// The response body did not match the expected completion shape.
    #[error("malformed translation response: {0}")]
    MalformedResponse(String),
}

impl TranslateError {
    /// Whether a retry with backoff is worthwhile.
    ///
    /// Timeouts, rate limits and 5xx responses are transient; quota
    /// exhaustion and 4xx rejections are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslateError::Timeout
            | TranslateError::RateLimited
            | TranslateError::Server { .. } => true,
            TranslateError::Http(e) => e.is_timeout() || e.is_connect(),
            TranslateError::QuotaExceeded
            | TranslateError::Api { .. }
            | TranslateError::EmptyResponse
            | TranslateError::MalformedResponse(_) => false,
        }
    }
}

/// Errors raised while writing the output bundle.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The output ZIP could not be written.
    #[error("failed to write output archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A filesystem I/O error occurred while writing the bundle.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal outcome of a whole batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Package(#[from] PackageError),
}

// ── Tests ──────────────────────────────────────────────────────────────────────
