//! Per-file diagnostics
//!
//! Everything that made a run less than complete is recorded here instead of
//! failing the run: skipped files, parse failures, abandoned files and
//! records the assembler refused.

use crate::language::SkipReason;
use crate::parser::ParseError;
use serde::Serialize;
use std::fmt;

/// What went wrong with one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The detector declined the file
    Skipped(SkipReason),
    /// The file did not parse cleanly
    ParseFailure(ParseError),
    /// A record broke a graph invariant and was dropped or reclassified
    ConsistencyViolation(String),
    /// The deadline passed before the file finished
    Abandoned,
}

/// A diagnostic attached to a file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: String,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn skipped(path: impl Into<String>, reason: SkipReason) -> Self {
        Self { path: path.into(), kind: DiagnosticKind::Skipped(reason) }
    }

    pub fn parse_failure(error: ParseError) -> Self {
        Self { path: error.path.clone(), kind: DiagnosticKind::ParseFailure(error) }
    }

    pub fn violation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: DiagnosticKind::ConsistencyViolation(message.into()),
        }
    }

    pub fn abandoned(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: DiagnosticKind::Abandoned }
    }

    /// Ordering key: path, then kind rank
    pub(crate) fn sort_key(&self) -> (&str, u8) {
        let rank = match self.kind {
            DiagnosticKind::Skipped(_) => 0,
            DiagnosticKind::ParseFailure(_) => 1,
            DiagnosticKind::Abandoned => 2,
            DiagnosticKind::ConsistencyViolation(_) => 3,
        };
        (&self.path, rank)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::Skipped(reason) => write!(f, "{}: skipped ({})", self.path, reason),
            DiagnosticKind::ParseFailure(error) => write!(f, "{}", error),
            DiagnosticKind::ConsistencyViolation(message) => {
                write!(f, "{}: consistency violation: {}", self.path, message)
            }
            DiagnosticKind::Abandoned => write!(f, "{}: abandoned at deadline", self.path),
        }
    }
}

/// Resolution gaps of one file: what static analysis could not pin down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionGap {
    pub unresolved_calls: usize,
    pub external_imports: usize,
}
