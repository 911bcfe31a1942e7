//! Conversion route: multipart upload in, translated download out.
//!
//! Accepts either one ZIP archive or one-or-more individual source files,
//! plus `source_platform`, `target_platform` and `conversion_type` form
//! fields.  The batch runs synchronously within the request and the
//! response is the finished bundle: `text/plain` for a single converted
//! file, `application/zip` otherwise.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use codeport_core::{
    batch, extract, BatchInput, BatchOptions, BatchSummary, ConversionScope, OutputBundle,
    Platform, UploadError,
};
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(create_conversion))]
pub struct ConversionsApi;

/// Register conversion routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/conversions", post(create_conversion))
}

/// Everything collected from the multipart form.
#[derive(Default)]
struct ConversionForm {
    uploads: Vec<(String, Vec<u8>)>,
    source_platform: Option<String>,
    target_platform: Option<String>,
    conversion_type: Option<String>,
}

/// Convert uploaded source files (`POST /v1/conversions`).
///
/// The response is a download: a single converted file comes back as
/// plain text, a project as a ZIP preserving relative paths.  Files the
/// AI service could not convert are included as comment-annotated
/// placeholders; `x-conversion-total` / `x-conversion-failed` response
/// headers carry the batch counts.
#[utoipa::path(
    post,
    path = "/v1/conversions",
    tag = "conversions",
    request_body(
        content = Vec<u8>,
        content_type = "multipart/form-data",
        description = "One ZIP archive or individual source files, plus \
                       source_platform / target_platform / conversion_type fields"
    ),
    responses(
        (status = 200, description = "Converted file (text/plain) or archive (application/zip)"),
        (status = 400, description = "Invalid upload or form fields"),
        (status = 401, description = "Missing or wrong API token"),
        (status = 413, description = "Upload exceeds the configured size limit"),
        (status = 500, description = "Packaging or internal failure"),
    )
)]
pub async fn create_conversion(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = read_form(multipart, state.config.max_upload_bytes()).await?;

    let source = parse_platform(form.source_platform.as_deref(), "source_platform")?;
    let target = parse_platform(form.target_platform.as_deref(), "target_platform")?;
    if source == target {
        return Err(ServerError::BadRequest(
            "source and target platforms must be different".into(),
        ));
    }
    let scope = parse_scope(form.conversion_type.as_deref())?;

    if form.uploads.is_empty() {
        return Err(ServerError::BadRequest("no files uploaded".into()));
    }

    info!(
        files = form.uploads.len(),
        source = %source,
        target = %target,
        scope = %scope,
        "conversion request accepted"
    );

    // Spool directory for archive uploads; dropped (and deleted) on every
    // exit path once the batch has run.
    let mut spool: Option<tempfile::TempDir> = None;
    let (input, upload_stem) = if form.uploads.len() == 1 && is_zip_name(&form.uploads[0].0) {
        let (name, bytes) = &form.uploads[0];
        let dir = match state.config.spool_dir.as_deref() {
            Some(root) => tempfile::tempdir_in(root),
            None => tempfile::tempdir(),
        }
        .map_err(|e| ServerError::Internal(format!("failed to create spool dir: {e}")))?;
        let path = dir.path().join("upload.zip");
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ServerError::Internal(format!("failed to spool upload: {e}")))?;
        debug!(archive = %name, size_bytes = bytes.len(), "spooled archive upload");
        let stem = archive_stem(name);
        spool = Some(dir);
        (BatchInput::Archive(path), stem)
    } else if form.uploads.iter().any(|(name, _)| is_zip_name(name)) {
        return Err(ServerError::BadRequest(
            "upload either one ZIP archive or individual source files, not both".into(),
        ));
    } else {
        let files = form
            .uploads
            .iter()
            .map(|(name, bytes)| extract::single_file(name, bytes, source))
            .collect::<Result<Vec<_>, UploadError>>()?;
        (BatchInput::Files(files), "conversion".to_owned())
    };

    let options = BatchOptions {
        source,
        target,
        scope,
        limits: state.config.extract_limits(),
        retry: state.config.retry_policy(),
        upload_stem,
    };

    let outcome = batch::run_batch(state.translator.as_ref(), input, &options).await;
    drop(spool);
    let (bundle, summary) = outcome?;

    bundle_response(bundle, summary)
}

/// Drain the multipart stream, enforcing the cumulative upload size limit
/// while reading.
async fn read_form(
    mut multipart: Multipart,
    max_bytes: u64,
) -> Result<ConversionForm, ServerError> {
    let mut form = ConversionForm::default();
    let mut received: u64 = 0;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("failed to read multipart field: {e}")))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let name = field.file_name().unwrap_or("upload").to_owned();
                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    ServerError::BadRequest(format!("failed to read file chunk: {e}"))
                })? {
                    received += chunk.len() as u64;
                    if received > max_bytes {
                        return Err(UploadError::TooLarge {
                            actual: received,
                            limit: max_bytes,
                        }
                        .into());
                    }
                    bytes.extend_from_slice(&chunk);
                }
                if bytes.is_empty() {
                    debug!(file = %name, "ignoring empty file part");
                    continue;
                }
                debug!(file = %name, size_bytes = bytes.len(), "received file upload");
                form.uploads.push((name, bytes));
            }
            "source_platform" => form.source_platform = Some(read_text(field).await?),
            "target_platform" => form.target_platform = Some(read_text(field).await?),
            "conversion_type" => form.conversion_type = Some(read_text(field).await?),
            other => {
                return Err(ServerError::BadRequest(format!("unknown form field: {other}")));
            }
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ServerError> {
    field
        .text()
        .await
        .map(|s| s.trim().to_owned())
        .map_err(|e| ServerError::BadRequest(format!("failed to read form field: {e}")))
}

fn parse_platform(raw: Option<&str>, field: &str) -> Result<Platform, ServerError> {
    let raw = raw
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServerError::BadRequest(format!("missing form field: {field}")))?;
    Platform::from_str(raw).map_err(|_| {
        ServerError::BadRequest(format!(
            "unknown {field} '{raw}'; expected one of: android_java, android_kotlin, ios_swift"
        ))
    })
}

fn parse_scope(raw: Option<&str>) -> Result<ConversionScope, ServerError> {
    match raw.filter(|s| !s.is_empty()) {
        None => Ok(ConversionScope::default()),
        Some(raw) => ConversionScope::from_str(raw).map_err(|_| {
            ServerError::BadRequest(format!(
                "unknown conversion_type '{raw}'; expected one of: full_project, logic_only, layouts_only"
            ))
        }),
    }
}

fn is_zip_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".zip")
}

/// Basename of the uploaded archive without its `.zip` extension, used in
/// the download name.
fn archive_stem(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = base.strip_suffix(".zip").or_else(|| base.strip_suffix(".ZIP")).unwrap_or(base);
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "conversion".to_owned() } else { cleaned }
}

fn bundle_response(bundle: OutputBundle, summary: BatchSummary) -> Result<Response, ServerError> {
    let (content_type, name, payload) = match bundle {
        OutputBundle::File { name, content } => {
            ("text/plain; charset=utf-8", name, content.into_bytes())
        }
        OutputBundle::Archive { name, bytes } => ("application/zip", name, bytes),
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{name}\""))
        .header("x-conversion-total", summary.total.to_string())
        .header("x-conversion-failed", summary.failed.to_string())
        .body(Body::from(payload))
        .map_err(|e| ServerError::Internal(format!("failed to build download response: {e}")))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{test_config, Config};
    use crate::routes;
    use async_trait::async_trait;
    use codeport_core::{error::TranslateError, Translator};
    use http_body_util::BodyExt;
    use std::io::{Cursor, Write};
    use tower::ServiceExt;

    const BOUNDARY: &str = "codeport-test-boundary";

    /// Echoes the user prompt; fails files whose prompt contains `poison`.
    struct TestTranslator {
        poison: Option<&'static str>,
    }

    #[async_trait]
    impl Translator for TestTranslator {
        async fn translate(&self, _system: &str, user: &str) -> Result<String, TranslateError> {
            if let Some(poison) = self.poison {
                if user.contains(poison) {
                    return Err(TranslateError::RateLimited);
                }
            }
            Ok(user.to_owned())
        }
    }

    fn app_with(config: Config, translator: TestTranslator) -> axum::Router {
        let state = Arc::new(AppState {
            config: Arc::new(config),
            translator: Arc::new(translator),
        });
        routes::build(state)
    }

    fn app() -> axum::Router {
        app_with(test_config(), TestTranslator { poison: None })
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(filename, contents) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(contents);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn conversion_request(parts: &[Part<'_>]) -> http::Request<Body> {
        http::Request::builder()
            .method(http::Method::POST)
            .uri("/v1/conversions")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn project_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn single_file_returns_plain_text_download() {
        let response = app()
            .oneshot(conversion_request(&[
                Part::Text("source_platform", "android_java"),
                Part::Text("target_platform", "ios_swift"),
                Part::File("Main.java", b"class Main {}"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains("converted_android_java_to_ios_swift_Main.swift"));
        assert_eq!(response.headers()["x-conversion-failed"], "0");

        // The echo translator returns the user prompt, which embeds the source.
        let body = body_bytes(response).await;
        assert!(String::from_utf8(body).unwrap().contains("class Main {}"));
    }

    #[tokio::test]
    async fn archive_with_partial_failure_returns_full_zip() {
        let app = app_with(test_config(), TestTranslator { poison: Some("Second.java") });
        let archive = project_zip(&[
            ("src/First.java", "class First {}"),
            ("src/Second.java", "class Second {}"),
            ("src/Third.java", "class Third {}"),
        ]);

        let response = app
            .oneshot(conversion_request(&[
                Part::Text("source_platform", "android_java"),
                Part::Text("target_platform", "ios_swift"),
                Part::File("project.zip", &archive),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
        assert_eq!(response.headers()["x-conversion-total"], "3");
        assert_eq!(response.headers()["x-conversion-failed"], "1");

        let bytes = body_bytes(response).await;
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> =
            (0..archive.len()).map(|i| archive.by_index(i).unwrap().name().to_owned()).collect();
        assert_eq!(names, vec!["src/First.swift", "src/Second.java", "src/Third.swift"]);
    }

    #[tokio::test]
    async fn missing_platform_field_is_rejected() {
        let response = app()
            .oneshot(conversion_request(&[
                Part::Text("target_platform", "ios_swift"),
                Part::File("Main.java", b"class Main {}"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn identical_platforms_are_rejected() {
        let response = app()
            .oneshot(conversion_request(&[
                Part::Text("source_platform", "android_java"),
                Part::Text("target_platform", "android_java"),
                Part::File("Main.java", b"class Main {}"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_platform_is_rejected() {
        let response = app()
            .oneshot(conversion_request(&[
                Part::Text("source_platform", "windows_phone"),
                Part::Text("target_platform", "ios_swift"),
                Part::File("Main.java", b"class Main {}"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_without_files_is_rejected() {
        let response = app()
            .oneshot(conversion_request(&[
                Part::Text("source_platform", "android_java"),
                Part::Text("target_platform", "ios_swift"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn zip_mixed_with_loose_files_is_rejected() {
        let archive = project_zip(&[("src/A.java", "class A {}")]);
        let response = app()
            .oneshot(conversion_request(&[
                Part::Text("source_platform", "android_java"),
                Part::Text("target_platform", "ios_swift"),
                Part::File("project.zip", &archive),
                Part::File("Main.java", b"class Main {}"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_with_413() {
        let spool_root = tempfile::tempdir().unwrap();
        let config = Config {
            max_upload_mb: 0,
            spool_dir: Some(spool_root.path().display().to_string()),
            ..test_config()
        };
        let app = app_with(config, TestTranslator { poison: None });
        let response = app
            .oneshot(conversion_request(&[
                Part::Text("source_platform", "android_java"),
                Part::Text("target_platform", "ios_swift"),
                Part::File("Main.java", b"class Main {}"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        // The rejection happens before anything touches disk.
        assert_eq!(std::fs::read_dir(spool_root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_batch_leaves_no_spooled_files() {
        let spool_root = tempfile::tempdir().unwrap();
        let config = Config {
            spool_dir: Some(spool_root.path().display().to_string()),
            ..test_config()
        };
        let app = app_with(config, TestTranslator { poison: None });

        // Nothing in the archive matches the source platform, so the
        // batch fails after the upload has already been spooled to disk.
        let archive = project_zip(&[("README.md", "# notes")]);
        let response = app
            .oneshot(conversion_request(&[
                Part::Text("source_platform", "android_java"),
                Part::Text("target_platform", "ios_swift"),
                Part::File("project.zip", &archive),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_dir(spool_root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn wrong_extension_for_platform_is_rejected() {
        let response = app()
            .oneshot(conversion_request(&[
                Part::Text("source_platform", "android_java"),
                Part::Text("target_platform", "ios_swift"),
                Part::File("Main.swift", b"struct Main {}"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn archive_stem_is_sanitized() {
        assert_eq!(archive_stem("My Project.zip"), "My_Project");
        assert_eq!(archive_stem("dir/app.ZIP"), "app");
        assert_eq!(archive_stem(".zip"), "conversion");
    }
}
