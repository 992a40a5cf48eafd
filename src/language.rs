//! Language Detector
//!
//! Maps a file path (and its raw bytes) to a supported language, or to a
//! [`SkipReason`]. Detection is a pure function and never fails: anything it
//! does not understand is skipped, not rejected.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Number of leading bytes inspected for NUL bytes when sniffing binaries.
const BINARY_SNIFF_LEN: usize = 8000;

/// Languages with a tree-sitter grammar and adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Rust,
    Go,
}

impl Language {
    /// Get the string representation of the language
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Rust => "rust",
            Language::Go => "go",
        }
    }

    /// Get all supported languages
    pub fn all() -> &'static [Language] {
        &[Language::Python, Language::JavaScript, Language::Rust, Language::Go]
    }

    /// File extensions handled by this language
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyi"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::Rust => &["rs"],
            Language::Go => &["go"],
        }
    }

    /// Find the language for an extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Language> {
        let ext = ext.to_ascii_lowercase();
        Language::all()
            .iter()
            .copied()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }
}

impl FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" => Ok(Language::JavaScript),
            "rust" | "rs" => Ok(Language::Rust),
            "go" | "golang" => Ok(Language::Go),
            _ => Err(crate::Error::Config(format!("Unknown language: {}", s))),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a file was left out of the analysis. Expected and non-fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    UnknownExtension { extension: String },
    NoExtension,
    Binary,
    NotUtf8,
    TooLarge { size: u64, limit: u64 },
    LanguageDisabled { language: Language },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnknownExtension { extension } => {
                write!(f, "unsupported file extension '.{}'", extension)
            }
            SkipReason::NoExtension => write!(f, "file has no extension"),
            SkipReason::Binary => write!(f, "binary file"),
            SkipReason::NotUtf8 => write!(f, "file is not valid UTF-8"),
            SkipReason::TooLarge { size, limit } => {
                write!(f, "file is {} bytes, exceeding the {} byte limit", size, limit)
            }
            SkipReason::LanguageDisabled { language } => {
                write!(f, "language '{}' is disabled", language)
            }
        }
    }
}

/// Outcome of language detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Supported(Language),
    Skip(SkipReason),
}

/// Limits applied while detecting.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Files larger than this are skipped
    pub max_file_bytes: u64,
    /// Languages that may be analyzed
    pub languages: Vec<Language>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 1024 * 1024,
            languages: Language::all().to_vec(),
        }
    }
}

/// Detect the language of a file.
///
/// Checks run cheapest-first: extension, enablement, size, binary sniff, UTF-8.
pub fn detect(path: &str, content: &[u8], config: &DetectorConfig) -> Detection {
    let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) else {
        return Detection::Skip(SkipReason::NoExtension);
    };

    let Some(language) = Language::from_extension(ext) else {
        return Detection::Skip(SkipReason::UnknownExtension {
            extension: ext.to_string(),
        });
    };

    if !config.languages.contains(&language) {
        return Detection::Skip(SkipReason::LanguageDisabled { language });
    }

    let size = content.len() as u64;
    if size > config.max_file_bytes {
        return Detection::Skip(SkipReason::TooLarge {
            size,
            limit: config.max_file_bytes,
        });
    }

    let sniff = &content[..content.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return Detection::Skip(SkipReason::Binary);
    }

    if std::str::from_utf8(content).is_err() {
        return Detection::Skip(SkipReason::NotUtf8);
    }

    Detection::Supported(language)
}
