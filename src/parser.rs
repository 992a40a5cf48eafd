//! Source parsing
//!
//! Wraps tree-sitter: one fresh parser per file, the adapter's grammar, an
//! optional timeout. A tree containing error or missing nodes is rejected
//! so downstream stages only ever see well-formed syntax.

use crate::adapter::LanguageAdapter;
use crate::source::SourceFile;
use serde::Serialize;
use std::time::Duration;
use tree_sitter::{Node, Parser, Tree};

/// Why a file could not be turned into a syntax tree.
///
/// Carries the position of the first offending node in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{path}:{line}:{column}: {message}")]
pub struct ParseError {
    pub path: String,
    /// 1-indexed line
    pub line: u32,
    /// 1-indexed byte column
    pub column: u32,
    pub message: String,
}

impl ParseError {
    fn whole_file(file: &SourceFile, message: impl Into<String>) -> Self {
        Self {
            path: file.path.clone(),
            line: 1,
            column: 1,
            message: message.into(),
        }
    }

    fn at(file: &SourceFile, node: Node<'_>, message: impl Into<String>) -> Self {
        let position = node.start_position();
        Self {
            path: file.path.clone(),
            line: position.row as u32 + 1,
            column: position.column as u32 + 1,
            message: message.into(),
        }
    }
}

/// A syntax tree for exactly one [`SourceFile`].
#[derive(Debug)]
pub struct SyntaxTree {
    tree: Tree,
}

impl SyntaxTree {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

/// Parse a file with its adapter's grammar
pub fn parse_source(
    file: &SourceFile,
    adapter: &dyn LanguageAdapter,
    timeout: Option<Duration>,
) -> Result<SyntaxTree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&adapter.grammar())
        .map_err(|e| ParseError::whole_file(file, format!("grammar unavailable: {}", e)))?;
    if let Some(timeout) = timeout {
        parser.set_timeout_micros(timeout.as_micros().min(u64::MAX as u128) as u64);
    }

    let tree = parser.parse(file.text.as_bytes(), None).ok_or_else(|| {
        ParseError::whole_file(file, "parser timed out or was cancelled")
    })?;

    if let Some(node) = first_error(tree.root_node()) {
        let message = if node.is_missing() {
            format!("missing `{}`", node.kind())
        } else {
            format!("unexpected `{}`", snippet(node, file.text.as_bytes()))
        };
        return Err(ParseError::at(file, node, message));
    }

    Ok(SyntaxTree { tree })
}

/// First ERROR or MISSING node in preorder
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    if !root.has_error() {
        return None;
    }
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        // Only descend where an error is known to live
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn snippet(node: Node<'_>, source: &[u8]) -> String {
    let text = node.utf8_text(source).unwrap_or("");
    let first_line = text.lines().next().unwrap_or("").trim();
    let mut snippet: String = first_line.chars().take(24).collect();
    if first_line.chars().count() > 24 {
        snippet.push_str("...");
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{GoAdapter, PythonAdapter};
    use crate::language::Language;

    #[test]
    fn test_parses_valid_python() {
        let file = SourceFile::new("ok.py", Language::Python, "def f():\n    return 1\n");
        let tree = parse_source(&file, &PythonAdapter, None).unwrap();
        assert_eq!(tree.root().kind(), "module");
    }

    #[test]
    fn test_reports_first_error_position() {
        let file = SourceFile::new(
            "bad.py",
            Language::Python,
            "def ok():\n    pass\n\ndef broken(:\n    pass\n",
        );
        let err = parse_source(&file, &PythonAdapter, None).unwrap_err();
        assert_eq!(err.path, "bad.py");
        assert_eq!(err.line, 4);
        assert!(err.to_string().starts_with("bad.py:4:"));
    }

    #[test]
    fn test_unclosed_block_is_rejected() {
        let file = SourceFile::new("x.go", Language::Go, "package x\n\nfunc f() {\n");
        let err = parse_source(&file, &GoAdapter, None).unwrap_err();
        assert!(err.line >= 3);
    }
}
