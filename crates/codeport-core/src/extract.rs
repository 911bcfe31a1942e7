//! Upload extraction and filtering.
//!
//! Turns an uploaded ZIP (or a single loose source file) into an
//! [`UploadBatch`]: the eligible source files for the declared platform,
//! plus binary assets carried through unconverted.  Entries are read into
//! memory; nothing from the archive is ever written back to disk.

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path};

use tracing::{debug, info, warn};

use crate::error::UploadError;
use crate::platform::Platform;

/// One eligible source file extracted from the upload.
///
/// Contents are decoded as lossy UTF-8, matching the tolerant read the
/// conversion prompt needs (source archives occasionally contain stray
/// non-UTF-8 bytes in comments).
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the archive root, forward-slash separated.
    pub rel_path: String,
    pub contents: String,
}

/// A binary asset preserved in the output without conversion.
#[derive(Debug, Clone)]
pub struct AssetFile {
    pub rel_path: String,
    pub bytes: Vec<u8>,
}

/// The filtered result of one user submission.
#[derive(Debug, Default)]
pub struct UploadBatch {
    /// Eligible source files, in archive order.
    pub files: Vec<SourceFile>,
    /// Assets carried through unconverted (images, media).
    pub assets: Vec<AssetFile>,
    /// Entries dropped by the skip list, for the summary log.
    pub skipped: usize,
}

/// Hard limits applied during extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    /// Maximum total decompressed size across all retained entries.
    pub max_total_bytes: u64,
    /// Maximum number of archive entries (files and directories).
    pub max_entries: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self { max_total_bytes: 50 * 1024 * 1024, max_entries: 2000 }
    }
}

/// Directory names that mark build output, caches or tooling noise.
const SKIP_DIRS: &[&str] = &[
    ".git", ".idea", ".vscode", "__pycache__",
    ".gradle", "build", "bin", "obj", "target", "gradle",
    "pods", "deriveddata", "generated", "cache", "temp", "tmp",
];

/// File extensions never worth sending for conversion.
const SKIP_SUFFIXES: &[&str] = &[
    ".gitignore", ".gitattributes",
    ".pro", ".properties",
    ".md", ".txt", ".pdf", ".docx",
    ".zip", ".tar", ".gz", ".rar",
    ".class", ".dex", ".o", ".jar",
];

/// Exact file names skipped regardless of location.
const SKIP_NAMES: &[&str] = &[
    ".ds_store", "thumbs.db", "gradlew", "gradlew.bat", "local.properties",
];

/// Extensions preserved as opaque assets in the output bundle.
const ASSET_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".ico", ".svg", ".webp",
    ".mp3", ".mp4", ".avi", ".mov", ".wav",
];

/// Manifest file names preserved regardless of platform, so the output
/// project stays whole even when the file is not a conversion input.
const PRESERVE_NAMES: &[&str] = &["androidmanifest.xml", "info.plist"];

/// Entries nested deeper than this are treated as build artifacts.
const MAX_ENTRY_DEPTH: usize = 6;

/// Extract and filter a ZIP archive at `path` for `platform`.
///
/// Fails with [`UploadError`] when the archive is invalid, an entry name
/// escapes the archive root, a limit is exceeded, or filtering leaves
/// nothing to convert.
pub fn extract_zip(
    path: &Path,
    platform: Platform,
    limits: &ExtractLimits,
) -> Result<UploadBatch, UploadError> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    if archive.len() > limits.max_entries {
        return Err(UploadError::TooManyEntries {
            actual: archive.len(),
            limit: limits.max_entries,
        });
    }

    debug!(entries = archive.len(), platform = %platform, "scanning archive");

    let mut batch = UploadBatch::default();
    let mut total_bytes: u64 = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        // Reject traversal before anything else; a hostile entry name fails
        // the whole upload rather than being silently dropped.
        let rel_path = match safe_entry_name(entry.name()) {
            Some(p) => p,
            None => return Err(UploadError::UnsafePath(entry.name().to_owned())),
        };

        if should_skip(&rel_path) {
            batch.skipped += 1;
            continue;
        }

        let is_source = platform.matches_extension(&rel_path);
        let is_asset = !is_source && (is_asset_path(&rel_path) || is_preserved_name(&rel_path));
        if !is_source && !is_asset {
            batch.skipped += 1;
            continue;
        }

        // The size field in the entry header is advisory; reject on it
        // early, then bound the actual read in case it understates the
        // real payload.
        let claimed = total_bytes.saturating_add(entry.size());
        if claimed > limits.max_total_bytes {
            return Err(UploadError::TooLarge {
                actual: claimed,
                limit: limits.max_total_bytes,
            });
        }

        let budget = limits.max_total_bytes - total_bytes;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        let read = (&mut entry).take(budget.saturating_add(1)).read_to_end(&mut bytes)? as u64;
        total_bytes = total_bytes.saturating_add(read);
        if total_bytes > limits.max_total_bytes {
            return Err(UploadError::TooLarge {
                actual: total_bytes,
                limit: limits.max_total_bytes,
            });
        }

        if is_source {
            if bytes.is_empty() {
                warn!(entry = %rel_path, "skipping empty source file");
                batch.skipped += 1;
                continue;
            }
            batch.files.push(SourceFile {
                rel_path,
                contents: String::from_utf8_lossy(&bytes).into_owned(),
            });
        } else {
            batch.assets.push(AssetFile { rel_path, bytes });
        }
    }

    info!(
        platform = %platform,
        source_files = batch.files.len(),
        assets = batch.assets.len(),
        skipped = batch.skipped,
        total_bytes,
        "archive extraction finished"
    );

    if batch.files.is_empty() {
        return Err(UploadError::NoEligibleFiles);
    }

    Ok(batch)
}

/// Wrap a single loose file upload as a one-entry batch.
///
/// The extension must match the declared source platform.
pub fn single_file(
    name: &str,
    bytes: &[u8],
    platform: Platform,
) -> Result<SourceFile, UploadError> {
    if !platform.matches_extension(name) {
        return Err(UploadError::UnsupportedExtension {
            platform: platform.label().to_owned(),
            file: name.to_owned(),
        });
    }
    Ok(SourceFile {
        rel_path: sanitize_filename(name),
        contents: String::from_utf8_lossy(bytes).into_owned(),
    })
}

/// Validate an archive entry name and normalize it to a relative
/// forward-slash path.  Returns `None` for absolute names or any name
/// containing a parent-directory component.
fn safe_entry_name(name: &str) -> Option<String> {
    let path = Path::new(name);
    let mut parts: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(p) => parts.push(p.to_str()?),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Strip path separators and shell-hostile characters from a loose upload
/// name, keeping only the final path component.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' }
        })
        .collect()
}

fn should_skip(rel_path: &str) -> bool {
    let lower = rel_path.to_ascii_lowercase();
    let segments: Vec<&str> = lower.split('/').collect();
    let file_name = segments.last().copied().unwrap_or("");

    if SKIP_NAMES.contains(&file_name) {
        return true;
    }
    if segments.len() > MAX_ENTRY_DEPTH + 1 {
        return true;
    }
    // Any directory segment on the skip list disqualifies the entry, as do
    // Xcode bundle directories (`.xcworkspace`, `.xcodeproj`).
    if segments[..segments.len() - 1].iter().any(|seg| {
        SKIP_DIRS.contains(seg) || seg.ends_with(".xcworkspace") || seg.ends_with(".xcodeproj")
    }) {
        return true;
    }
    SKIP_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

fn is_asset_path(rel_path: &str) -> bool {
    let lower = rel_path.to_ascii_lowercase();
    ASSET_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

fn is_preserved_name(rel_path: &str) -> bool {
    let name = rel_path.rsplit('/').next().unwrap_or(rel_path).to_ascii_lowercase();
    PRESERVE_NAMES.contains(&name.as_str())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build a ZIP on disk from (name, contents) pairs and return its path.
    fn write_zip(dir: &Path, entries: &[(&str, &[u8])]) -> std::path::PathBuf {
        let path = dir.join("upload.zip");
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, contents) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn filters_to_matching_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            &[
                ("src/Main.java", b"class Main {}".as_slice()),
                ("res/layout/activity_main.xml", b"<LinearLayout/>"),
                ("src/Helper.kt", b"object Helper"),
                ("notes.md", b"# notes"),
            ],
        );

        let batch =
            extract_zip(&path, Platform::AndroidJava, &ExtractLimits::default()).unwrap();
        let paths: Vec<&str> = batch.files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["src/Main.java", "res/layout/activity_main.xml"]);
        assert_eq!(batch.skipped, 2);
    }

    #[test]
    fn rejects_path_traversal_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            &[
                ("../evil.java", b"class Evil {}".as_slice()),
                ("src/Main.java", b"class Main {}"),
            ],
        );

        let err =
            extract_zip(&path, Platform::AndroidJava, &ExtractLimits::default()).unwrap_err();
        assert!(matches!(err, UploadError::UnsafePath(_)));
    }

    #[test]
    fn skips_build_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            &[
                ("build/gen/Main.java", b"class Gen {}".as_slice()),
                (".gradle/cache.java", b"class C {}"),
                ("src/Main.java", b"class Main {}"),
            ],
        );

        let batch =
            extract_zip(&path, Platform::AndroidJava, &ExtractLimits::default()).unwrap();
        assert_eq!(batch.files.len(), 1);
        assert_eq!(batch.files[0].rel_path, "src/Main.java");
    }

    #[test]
    fn preserves_binary_assets() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            &[
                ("src/Main.java", b"class Main {}".as_slice()),
                ("res/drawable/icon.png", &[0x89, 0x50, 0x4e, 0x47]),
            ],
        );

        let batch =
            extract_zip(&path, Platform::AndroidJava, &ExtractLimits::default()).unwrap();
        assert_eq!(batch.assets.len(), 1);
        assert_eq!(batch.assets[0].rel_path, "res/drawable/icon.png");
        assert_eq!(batch.assets[0].bytes, vec![0x89, 0x50, 0x4e, 0x47]);
    }

    #[test]
    fn empty_filter_result_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(dir.path(), &[("README.md", b"hello".as_slice())]);

        let err =
            extract_zip(&path, Platform::IosSwift, &ExtractLimits::default()).unwrap_err();
        assert!(matches!(err, UploadError::NoEligibleFiles));
    }

    #[test]
    fn enforces_total_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let big = vec![b'x'; 4096];
        let path = write_zip(
            dir.path(),
            &[("src/A.java", big.as_slice()), ("src/B.java", big.as_slice())],
        );

        let limits = ExtractLimits { max_total_bytes: 4096, max_entries: 2000 };
        let err = extract_zip(&path, Platform::AndroidJava, &limits).unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { .. }));
    }

    #[test]
    fn size_limit_holds_when_entry_metadata_lies() {
        use std::io::Cursor;

        // Store a large entry uncompressed, then understate its size
        // fields in both the local header and the central directory.
        let payload = vec![b'x'; 8192];
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer.start_file("src/Main.java", options).unwrap();
        writer.write_all(&payload).unwrap();
        let mut bytes = writer.finish().unwrap().into_inner();

        let patch = |buf: &mut [u8], offset: usize| {
            buf[offset..offset + 4].copy_from_slice(&10u32.to_le_bytes());
        };
        // Local file header: compressed size at +18, uncompressed at +22.
        patch(&mut bytes, 18);
        patch(&mut bytes, 22);
        // Central directory header: sizes at +20 and +24 from its signature.
        let central = bytes
            .windows(4)
            .position(|w| w == [0x50, 0x4b, 0x01, 0x02])
            .unwrap();
        patch(&mut bytes, central + 20);
        patch(&mut bytes, central + 24);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lying.zip");
        std::fs::write(&path, &bytes).unwrap();

        let limits = ExtractLimits { max_total_bytes: 1000, max_entries: 10 };
        let err = extract_zip(&path, Platform::AndroidJava, &limits).unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { .. }));
    }

    #[test]
    fn manifest_files_are_preserved_as_assets() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            &[
                ("Sources/Main.swift", b"struct Main {}".as_slice()),
                ("App/Info.plist", b"<plist version=\"1.0\"/>"),
            ],
        );

        let batch = extract_zip(&path, Platform::IosSwift, &ExtractLimits::default()).unwrap();
        assert_eq!(batch.files.len(), 1);
        assert_eq!(batch.assets.len(), 1);
        assert_eq!(batch.assets[0].rel_path, "App/Info.plist");
        assert_eq!(batch.skipped, 0);
    }

    #[test]
    fn enforces_entry_count_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            &[
                ("src/A.java", b"a".as_slice()),
                ("src/B.java", b"b"),
                ("src/C.java", b"c"),
            ],
        );

        let limits = ExtractLimits { max_total_bytes: 1 << 20, max_entries: 2 };
        let err = extract_zip(&path, Platform::AndroidJava, &limits).unwrap_err();
        assert!(matches!(err, UploadError::TooManyEntries { actual: 3, limit: 2 }));
    }

    #[test]
    fn single_file_validates_extension() {
        let file = single_file("Main.java", b"class Main {}", Platform::AndroidJava).unwrap();
        assert_eq!(file.rel_path, "Main.java");
        assert_eq!(file.contents, "class Main {}");

        let err = single_file("Main.swift", b"struct M {}", Platform::AndroidJava).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedExtension { .. }));
    }

    #[test]
    fn single_file_strips_directories_from_name() {
        let file =
            single_file("../../tmp/Main.java", b"class Main {}", Platform::AndroidJava).unwrap();
        assert_eq!(file.rel_path, "Main.java");
    }

    #[test]
    fn safe_entry_name_normalizes() {
        assert_eq!(safe_entry_name("a/./b.java").as_deref(), Some("a/b.java"));
        assert_eq!(safe_entry_name("a/../b.java"), None);
        assert_eq!(safe_entry_name("/etc/passwd"), None);
        assert_eq!(safe_entry_name(""), None);
    }
}
