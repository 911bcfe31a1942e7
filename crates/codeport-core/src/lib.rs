//! codeport-core – the conversion pipeline behind codeport-server.
//!
//! Takes an upload (ZIP archive or loose source files), filters it down to
//! the files a source platform recognizes, translates each one through an
//! external AI service, and packages the results for download.
//!
//! The pipeline is deliberately linear:
//!
//! ```text
//! upload ──▶ extract/filter ──▶ convert (per file, retry+fallback) ──▶ package
//! ```
//!
//! Extraction failures abort the batch; per-file conversion failures do
//! not.  They become comment-annotated placeholders in the output so that
//! one hung or rejected call never costs the user the rest of the project.

pub mod batch;
pub mod bundle;
pub mod error;
pub mod extract;
pub mod platform;
pub mod prompt;
pub mod translate;

pub use batch::{run_batch, BatchInput, BatchOptions, BatchPhase, BatchSummary};
pub use bundle::OutputBundle;
pub use error::{BatchError, PackageError, TranslateError, UploadError};
pub use extract::{AssetFile, ExtractLimits, SourceFile, UploadBatch};
pub use platform::{ConversionScope, Platform};
pub use translate::{ConversionResult, OpenAiTranslator, RetryPolicy, Translator};
