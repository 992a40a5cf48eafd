//! # repomap - Repository analysis engine
//!
//! Statically maps a repository into a graph that documentation generators
//! can consume.
//!
//! repomap provides:
//! - Language detection with recorded skip reasons
//! - Tree-sitter based parsing with pluggable language adapters
//! - Symbol extraction (modules, classes, functions, methods) with spans
//! - Import classification (internal file vs. external package)
//! - Call-reference resolution across imported files
//! - A frozen, deterministic `RepositoryGraph` plus completeness diagnostics

pub mod uri;
pub mod symbol;
pub mod edge;
pub mod language;
pub mod source;
pub mod parser;
pub mod adapter;
pub mod scope;
pub mod extract;
pub mod linker;
pub mod assembler;
pub mod graph;
pub mod diagnostics;
pub mod engine;
pub mod report;
pub mod config;
pub mod discover;
pub mod ui;

// Re-exports for convenient access
pub use uri::SymbolUri;
pub use symbol::{Symbol, SymbolId, SymbolKind};
pub use edge::{CallEdge, Callee, ImportEdge, ImportTarget};
pub use language::{Detection, Language, SkipReason};
pub use source::SourceFile;
pub use parser::ParseError;
pub use graph::RepositoryGraph;
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use engine::{Analyzer, InputFile};
pub use report::{AnalysisReport, Completeness};
pub use config::AnalyzerConfig;

/// Result type alias for repomap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for repomap operations.
///
/// Per-file problems never surface here; they are recorded as
/// [`Diagnostic`]s on the report. Only failures that prevent a run from
/// producing anything at all are errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No input files supplied for analysis")]
    NoInput,

    #[error("Grammar error: {0}")]
    Grammar(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
