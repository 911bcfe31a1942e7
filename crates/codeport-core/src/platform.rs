//! Supported mobile platforms and the conversion-scope filter.
//!
//! Each platform carries a static set of recognized source-file extensions;
//! extension checks everywhere else in the crate go through this module
//! rather than ad-hoc string matching.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// A supported mobile source ecosystem.
///
/// The wire form (form fields, JSON) is snake_case: `android_java`,
/// `android_kotlin`, `ios_swift`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    AndroidJava,
    AndroidKotlin,
    IosSwift,
}

impl Platform {
    /// All platforms, in declaration order.
    pub fn all() -> Vec<Platform> {
        Platform::iter().collect()
    }

    /// Human-readable label used in prompts and UI listings.
    pub fn label(&self) -> &'static str {
        match self {
            Platform::AndroidJava => "Android Java",
            Platform::AndroidKotlin => "Android Kotlin",
            Platform::IosSwift => "iOS Swift",
        }
    }

    /// File extensions (lowercase, with leading dot) recognized as source
    /// input for this platform.
    pub fn source_extensions(&self) -> &'static [&'static str] {
        match self {
            Platform::AndroidJava => &[".java", ".xml"],
            Platform::AndroidKotlin => &[".kt", ".xml"],
            Platform::IosSwift => &[".swift", ".storyboard", ".xib"],
        }
    }

    /// Extension given to converted logic files targeting this platform.
    pub fn code_extension(&self) -> &'static str {
        match self {
            Platform::AndroidJava => ".java",
            Platform::AndroidKotlin => ".kt",
            Platform::IosSwift => ".swift",
        }
    }

    /// Line-comment prefix valid in this platform's primary language.
    /// Used to annotate failed conversions so the placeholder stays a
    /// syntactically valid file.
    pub fn comment_prefix(&self) -> &'static str {
        // Java, Kotlin and Swift all use C-style line comments.
        "//"
    }

    /// Whether `rel_path` has an extension this platform recognizes.
    pub fn matches_extension(&self, rel_path: &str) -> bool {
        let lower = rel_path.to_ascii_lowercase();
        self.source_extensions().iter().any(|ext| lower.ends_with(ext))
    }
}

/// The conversion-type filter: a per-file binary convert/pass-through
/// decision based on the file's extension category.  Files outside the
/// scope stay in the output unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversionScope {
    /// Convert every eligible file.
    #[default]
    FullProject,
    /// Only logic files (`.java`, `.kt`, `.swift`).
    LogicOnly,
    /// Only layout/markup files (`.xml`, `.storyboard`, `.xib`, or a path
    /// containing `layout`).
    LayoutsOnly,
}

const LOGIC_EXTENSIONS: &[&str] = &[".java", ".kt", ".swift"];
const LAYOUT_EXTENSIONS: &[&str] = &[".xml", ".storyboard", ".xib"];

impl ConversionScope {
    /// Whether a file at `rel_path` is converted under this scope.
    pub fn retains(&self, rel_path: &str) -> bool {
        let lower = rel_path.to_ascii_lowercase();
        match self {
            ConversionScope::FullProject => true,
            ConversionScope::LogicOnly => {
                LOGIC_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
            }
            ConversionScope::LayoutsOnly => {
                LAYOUT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
                    || lower.contains("layout")
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
