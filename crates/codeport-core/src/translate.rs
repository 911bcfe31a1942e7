//! Conversion unit: one external AI call per source file, with bounded
//! retry and a placeholder fallback.
//!
//! The external service sits behind the [`Translator`] trait so the whole
//! pipeline can run against a mock in tests.  The production implementation
//! [`OpenAiTranslator`] speaks the OpenAI-compatible chat-completions wire
//! format.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::TranslateError;
use crate::extract::SourceFile;
use crate::platform::Platform;
use crate::prompt;

/// Maximum completion size requested from the service.
const MAX_COMPLETION_TOKENS: u32 = 4000;

/// Low temperature keeps conversions close to deterministic.
const TEMPERATURE: f32 = 0.1;

/// Text-in/text-out boundary to the external AI service.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Submit one completion request and return the raw completion text.
    async fn translate(&self, system: &str, user: &str) -> Result<String, TranslateError>;
}

/// Bounded retry with exponential backoff between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, initial_backoff: Duration::from_secs(2) }
    }
}

/// Per-file outcome of the conversion unit.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Output path, relative; extension remapped on success.
    pub rel_path: String,
    /// Translated text, the untouched original (pass-through), or the
    /// placeholder comment on failure.
    pub content: String,
    /// `true` only when `content` is translated output.
    pub converted: bool,
    /// Failure reason; `None` for successes and pass-throughs.
    pub error: Option<String>,
}

/// Convert one source file, retrying transient service failures.
///
/// Never returns an error: persistent failure produces a
/// [`ConversionResult`] whose content is a comment-formatted explanation
/// followed by the untouched original source, so the batch always keeps
/// one output per input.
pub async fn convert_source_file(
    translator: &dyn Translator,
    file: &SourceFile,
    source: Platform,
    target: Platform,
    retry: &RetryPolicy,
) -> ConversionResult {
    let system = prompt::system_prompt(source, target);
    let user = prompt::user_prompt(&file.rel_path, &file.contents, source, target);

    let mut backoff = retry.initial_backoff;
    let mut last_error: Option<TranslateError> = None;

    for attempt in 1..=retry.max_attempts.max(1) {
        debug!(
            file = %file.rel_path,
            attempt,
            max_attempts = retry.max_attempts,
            "submitting conversion request"
        );

        match translator.translate(&system, &user).await {
            Ok(raw) => {
                let text = strip_code_fences(raw.trim()).to_owned();
                if text.is_empty() {
                    last_error = Some(TranslateError::EmptyResponse);
                    break;
                }
                info!(file = %file.rel_path, attempt, output_len = text.len(), "file converted");
                return ConversionResult {
                    rel_path: converted_rel_path(&file.rel_path, target),
                    content: text,
                    converted: true,
                    error: None,
                };
            }
            Err(e) => {
                warn!(file = %file.rel_path, attempt, error = %e, "conversion attempt failed");
                let retryable = e.is_retryable();
                last_error = Some(e);
                if !retryable || attempt == retry.max_attempts {
                    break;
                }
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
        }
    }

    let reason = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "unknown conversion failure".to_owned());
    warn!(file = %file.rel_path, error = %reason, "conversion failed; emitting placeholder");
    ConversionResult {
        rel_path: file.rel_path.clone(),
        content: failure_placeholder(&reason, file, source, target),
        converted: false,
        error: Some(reason),
    }
}

/// Carry a file into the output unchanged (outside the conversion scope).
pub fn passthrough(file: &SourceFile) -> ConversionResult {
    ConversionResult {
        rel_path: file.rel_path.clone(),
        content: file.contents.clone(),
        converted: false,
        error: None,
    }
}

/// Remap a converted file's extension to the target platform's code
/// extension.  Failed files keep their original path (see
/// [`convert_source_file`]).
pub fn converted_rel_path(rel_path: &str, target: Platform) -> String {
    match rel_path.rsplit_once('.') {
        Some((stem, _ext)) => format!("{stem}{}", target.code_extension()),
        None => format!("{rel_path}{}", target.code_extension()),
    }
}

/// Comment-formatted placeholder: the failure reason plus the untouched
/// original source, valid as a comment in the target language.
fn failure_placeholder(
    reason: &str,
    file: &SourceFile,
    source: Platform,
    target: Platform,
) -> String {
    let c = target.comment_prefix();
    format!(
        "{c} CONVERSION FAILED: {reason}\n\
         {c} Original {} source for {} is preserved below.\n\
         \n\
         {}",
        source.label(),
        file.rel_path,
        file.contents,
    )
}

/// Strip a single wrapping markdown code fence, if present.
///
/// Models occasionally ignore the "no markdown" instruction and wrap the
/// answer in ```` ```swift … ``` ````.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let Some(after_open) = trimmed.find('\n') else {
        return trimmed;
    };
    let inner = &trimmed[after_open + 1..];
    match inner.rfind("```") {
        Some(close) => inner[..close].trim_end(),
        None => inner,
    }
}

// ── OpenAI-compatible client ──────────────────────────────────────────────────

/// Chat-completions wire types (request side mirrors the OpenAI REST spec).
mod wire {
    use super::*;

    #[derive(Debug, Serialize)]
    pub struct ChatMessage<'a> {
        pub role: &'static str,
        pub content: &'a str,
    }

    #[derive(Debug, Serialize)]
    pub struct ChatCompletionRequest<'a> {
        pub model: &'a str,
        pub messages: Vec<ChatMessage<'a>>,
        pub max_tokens: u32,
        pub temperature: f32,
    }

    #[derive(Debug, Deserialize)]
    pub struct ChatCompletionResponse {
        pub choices: Vec<ChatChoice>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ChatChoice {
        pub message: ResponseMessage,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseMessage {
        pub content: Option<String>,
    }

    /// Error body shape: `{"error": {"message": "...", "code": "..."}}`.
    #[derive(Debug, Deserialize)]
    pub struct ApiErrorBody {
        pub error: Option<ApiErrorDetail>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ApiErrorDetail {
        pub message: Option<String>,
        pub code: Option<String>,
    }
}

/// Production [`Translator`] backed by an OpenAI-compatible HTTP API.
pub struct OpenAiTranslator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiTranslator {
    /// Build a client with a hard per-call timeout.
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("codeport/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
        })
    }

    fn classify_failure(status: u16, body: &[u8]) -> TranslateError {
        let detail: Option<wire::ApiErrorDetail> =
            serde_json::from_slice::<wire::ApiErrorBody>(body)
                .ok()
                .and_then(|b| b.error);
        let code = detail.as_ref().and_then(|d| d.code.as_deref()).unwrap_or("");

        if code == "insufficient_quota" {
            return TranslateError::QuotaExceeded;
        }
        match status {
            429 => TranslateError::RateLimited,
            500..=599 => TranslateError::Server { status },
            _ => TranslateError::Api {
                status,
                message: detail
                    .and_then(|d| d.message)
                    .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned()),
            },
        }
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, system: &str, user: &str) -> Result<String, TranslateError> {
        let request = wire::ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                wire::ChatMessage { role: "system", content: system },
                wire::ChatMessage { role: "user", content: user },
            ],
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() { TranslateError::Timeout } else { TranslateError::Http(e) }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(Self::classify_failure(status.as_u16(), &body));
        }

        let completion: wire::ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::MalformedResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(TranslateError::EmptyResponse)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
