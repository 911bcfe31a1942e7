//! Batch orchestration: extraction → per-file conversion → packaging.
//!
//! The run moves through a linear phase machine,
//! `Received → Extracting → Converting(i/n) → Packaging → Complete | Failed`,
//! logged with the batch ID at each transition.  Extraction and packaging
//! failures are terminal; per-file conversion failures are not, since the
//! failed file's placeholder is packaged so the caller can see what went
//! wrong.

use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};
use uuid::Uuid;

use crate::bundle::{self, OutputBundle};
use crate::error::{BatchError, UploadError};
use crate::extract::{self, ExtractLimits, SourceFile, UploadBatch};
use crate::platform::{ConversionScope, Platform};
use crate::translate::{self, RetryPolicy, Translator};

/// Where the batch's files come from.
#[derive(Debug)]
pub enum BatchInput {
    /// A spooled ZIP archive on disk.
    Archive(PathBuf),
    /// Loose files already read from the upload.
    Files(Vec<SourceFile>),
}

/// Progress of one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Received,
    Extracting,
    Converting { done: usize, total: usize },
    Packaging,
    Complete,
    Failed,
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchPhase::Received => write!(f, "received"),
            BatchPhase::Extracting => write!(f, "extracting"),
            BatchPhase::Converting { done, total } => write!(f, "converting {done}/{total}"),
            BatchPhase::Packaging => write!(f, "packaging"),
            BatchPhase::Complete => write!(f, "complete"),
            BatchPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Per-run settings, assembled by the caller from request fields and config.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub source: Platform,
    pub target: Platform,
    pub scope: ConversionScope,
    pub limits: ExtractLimits,
    pub retry: RetryPolicy,
    /// Stem used for the archive download name (the original upload's
    /// filename without extension, or `"conversion"`).
    pub upload_stem: String,
}

/// Counts reported alongside the bundle.
#[derive(Debug, Clone, Copy)]
pub struct BatchSummary {
    /// Files in the output bundle (converted + failed + passed through).
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
    /// Files outside the conversion scope, carried through unchanged.
    pub passed_through: usize,
    pub assets: usize,
    pub skipped: usize,
}

/// Run one conversion batch end to end.
pub async fn run_batch(
    translator: &dyn Translator,
    input: BatchInput,
    opts: &BatchOptions,
) -> Result<(OutputBundle, BatchSummary), BatchError> {
    let batch_id = Uuid::new_v4();
    let mut phase = BatchPhase::Received;
    info!(
        batch_id = %batch_id,
        source = %opts.source,
        target = %opts.target,
        scope = %opts.scope,
        phase = %phase,
        "batch received"
    );

    // ── Extracting ────────────────────────────────────────────────────────────
    phase = BatchPhase::Extracting;
    info!(batch_id = %batch_id, phase = %phase, "extracting upload");

    let extracted = match gather(&input, opts) {
        Ok(batch) => batch,
        Err(e) => {
            warn!(batch_id = %batch_id, phase = %BatchPhase::Failed, error = %e, "extraction failed");
            return Err(e.into());
        }
    };

    let files = extracted.files;
    let total = files.iter().filter(|f| opts.scope.retains(&f.rel_path)).count();
    if total == 0 {
        warn!(batch_id = %batch_id, phase = %BatchPhase::Failed, "conversion scope left no files");
        return Err(UploadError::NoEligibleFiles.into());
    }

    // ── Converting ────────────────────────────────────────────────────────────
    // Files outside the scope stay in the bundle untouched, in archive order.
    let mut results = Vec::with_capacity(files.len());
    let mut done = 0;
    for file in &files {
        if !opts.scope.retains(&file.rel_path) {
            info!(batch_id = %batch_id, file = %file.rel_path, "outside conversion scope; passing through");
            results.push(translate::passthrough(file));
            continue;
        }
        phase = BatchPhase::Converting { done, total };
        info!(batch_id = %batch_id, phase = %phase, file = %file.rel_path, "converting file");
        let result =
            translate::convert_source_file(translator, file, opts.source, opts.target, &opts.retry)
                .await;
        results.push(result);
        done += 1;
    }
    let converted = results.iter().filter(|r| r.converted).count();
    let failed = results.iter().filter(|r| r.error.is_some()).count();
    let passed_through = results.len() - total;

    // ── Packaging ─────────────────────────────────────────────────────────────
    phase = BatchPhase::Packaging;
    info!(
        batch_id = %batch_id,
        phase = %phase,
        files = results.len(),
        converted,
        failed,
        passed_through,
        "packaging results"
    );

    let single_name = results
        .first()
        .map(|r| download_name(opts, file_basename(&r.rel_path)))
        .unwrap_or_default();
    let archive_name = download_name(opts, &format!("{}.zip", opts.upload_stem));

    let summary = BatchSummary {
        total: results.len(),
        converted,
        failed,
        passed_through,
        assets: extracted.assets.len(),
        skipped: extracted.skipped,
    };

    let bundle = match bundle::package(results, extracted.assets, single_name, archive_name) {
        Ok(b) => b,
        Err(e) => {
            warn!(batch_id = %batch_id, phase = %BatchPhase::Failed, error = %e, "packaging failed");
            return Err(e.into());
        }
    };

    phase = BatchPhase::Complete;
    info!(
        batch_id = %batch_id,
        phase = %phase,
        bundle = %bundle.name(),
        archive = bundle.is_archive(),
        "batch complete"
    );
    Ok((bundle, summary))
}

fn gather(input: &BatchInput, opts: &BatchOptions) -> Result<UploadBatch, UploadError> {
    match input {
        BatchInput::Archive(path) => extract::extract_zip(path, opts.source, &opts.limits),
        BatchInput::Files(files) => {
            if files.is_empty() {
                return Err(UploadError::NoEligibleFiles);
            }
            Ok(UploadBatch { files: files.clone(), assets: Vec::new(), skipped: 0 })
        }
    }
}

fn download_name(opts: &BatchOptions, base: &str) -> String {
    format!("converted_{}_to_{}_{base}", opts.source, opts.target)
}

fn file_basename(rel_path: &str) -> &str {
    rel_path.rsplit('/').next().unwrap_or(rel_path)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
