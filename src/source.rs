//! Source files admitted into an analysis run.

use crate::language::Language;
use serde::Serialize;
use std::sync::Arc;

/// A discovered file with a supported language and UTF-8 text.
///
/// Created once by the engine after detection and never modified. The text is
/// shared (`Arc`) so worker threads can read it without copying.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    /// Detected language
    pub language: Language,
    /// blake3 digest of the content (hex)
    pub hash: String,
    /// Number of lines
    pub line_count: u32,
    /// Raw text
    #[serde(skip)]
    pub text: Arc<str>,
    /// Byte offset of the start of each line
    #[serde(skip)]
    line_offsets: Vec<usize>,
}

impl SourceFile {
    /// Create a new source file
    pub fn new(path: impl Into<String>, language: Language, text: impl Into<Arc<str>>) -> Self {
        let text: Arc<str> = text.into();
        let line_offsets = line_offsets(&text);
        let hash = blake3::hash(text.as_bytes()).to_hex().to_string();

        Self {
            path: normalize_path(&path.into()),
            language,
            hash,
            line_count: line_offsets.len() as u32,
            text,
            line_offsets,
        }
    }

    /// 1-indexed line containing `byte`
    pub fn line_of(&self, byte: usize) -> u32 {
        match self.line_offsets.binary_search(&byte) {
            Ok(idx) => idx as u32 + 1,
            Err(idx) => idx as u32,
        }
    }

    /// Text of a 1-indexed line, without the trailing newline
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let idx = (line as usize).checked_sub(1)?;
        let start = *self.line_offsets.get(idx)?;
        let end = self
            .line_offsets
            .get(idx + 1)
            .copied()
            .unwrap_or(self.text.len());
        Some(self.text[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Line start offsets
    pub fn line_offsets(&self) -> &[usize] {
        &self.line_offsets
    }

    /// Directory part of the path (`""` for files at the root)
    pub fn dir(&self) -> &str {
        parent_dir(&self.path)
    }
}

/// Convert platform separators and strip a leading `./`.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

/// Directory part of a `/`-separated relative path.
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn line_offsets(text: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    offsets.extend(
        text.bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n')
            .map(|(i, _)| i + 1)
            .filter(|&start| start < text.len()),
    );
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_offsets_and_lookup() {
        let file = SourceFile::new("a.py", Language::Python, "one\ntwo\nthree\n");
        assert_eq!(file.line_offsets(), &[0, 4, 8]);
        assert_eq!(file.line_count, 3);
        assert_eq!(file.line_of(0), 1);
        assert_eq!(file.line_of(5), 2);
        assert_eq!(file.line_of(8), 3);
        assert_eq!(file.line_text(2), Some("two"));
        assert_eq!(file.line_text(4), None);
    }

    #[test]
    fn test_path_normalization() {
        let file = SourceFile::new("./pkg\\mod.py", Language::Python, "");
        assert_eq!(file.path, "pkg/mod.py");
        assert_eq!(file.dir(), "pkg");
        assert_eq!(parent_dir("main.py"), "");
    }

    #[test]
    fn test_hash_is_content_addressed() {
        let a = SourceFile::new("a.py", Language::Python, "x = 1\n");
        let b = SourceFile::new("b.py", Language::Python, "x = 1\n");
        let c = SourceFile::new("c.py", Language::Python, "x = 2\n");
        assert_eq!(a.hash, b.hash);
        assert_ne!(a.hash, c.hash);
    }
}
