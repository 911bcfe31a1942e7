//! Output packaging.
//!
//! A batch with exactly one converted file (and no preserved assets) is
//! returned as plain text; anything larger becomes a ZIP preserving the
//! original relative directory structure.

use std::io::{Cursor, Write};

use tracing::debug;
use zip::write::SimpleFileOptions;

use crate::error::PackageError;
use crate::extract::AssetFile;
use crate::translate::ConversionResult;

/// The final downloadable artifact.
#[derive(Debug)]
pub enum OutputBundle {
    /// Single-file result, served as `text/plain`.
    File { name: String, content: String },
    /// Multi-file result, served as `application/zip`.
    Archive { name: String, bytes: Vec<u8> },
}

impl OutputBundle {
    pub fn name(&self) -> &str {
        match self {
            OutputBundle::File { name, .. } => name,
            OutputBundle::Archive { name, .. } => name,
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, OutputBundle::Archive { .. })
    }
}

/// Package conversion results and preserved assets into an [`OutputBundle`].
///
/// Every result is included, placeholders and all; the entry count of an
/// archive always equals `results.len() + assets.len()`.
pub fn package(
    mut results: Vec<ConversionResult>,
    assets: Vec<AssetFile>,
    single_name: String,
    archive_name: String,
) -> Result<OutputBundle, PackageError> {
    if results.len() == 1 && assets.is_empty() {
        let result = results.swap_remove(0);
        debug!(file = %result.rel_path, "packaging single-file bundle");
        return Ok(OutputBundle::File { name: single_name, content: result.content });
    }

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for result in &results {
        writer.start_file(result.rel_path.as_str(), options)?;
        writer.write_all(result.content.as_bytes())?;
    }
    for asset in &assets {
        writer.start_file(asset.rel_path.as_str(), options)?;
        writer.write_all(&asset.bytes)?;
    }

    let cursor = writer.finish()?;
    let bytes = cursor.into_inner();
    debug!(
        entries = results.len() + assets.len(),
        size_bytes = bytes.len(),
        "packaged archive bundle"
    );
    Ok(OutputBundle::Archive { name: archive_name, bytes })
}

// ── Tests ──────────────────────────────────────────────────────────────────────
