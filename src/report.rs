//! Analysis report
//!
//! The graph together with everything that kept it from being complete.

use crate::diagnostics::{Diagnostic, DiagnosticKind, ResolutionGap};
use crate::edge::{CallEdge, ImportEdge};
use crate::graph::{GraphStats, RepositoryGraph};
use crate::source::SourceFile;
use crate::symbol::Symbol;
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

/// How much of the repository the graph covers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Completeness {
    pub files_analyzed: usize,
    pub files_skipped: usize,
    pub parse_failures: usize,
    pub abandoned: usize,
    pub consistency_violations: usize,
    pub unresolved_calls: usize,
    pub external_imports: usize,
    /// The deadline passed before every file finished
    pub partial: bool,
    /// Files with at least one unresolved call or external import
    pub unresolved_by_file: BTreeMap<String, ResolutionGap>,
}

impl Completeness {
    pub fn measure(graph: &RepositoryGraph, diagnostics: &[Diagnostic], partial: bool) -> Self {
        let mut completeness = Completeness {
            files_analyzed: graph.files().len(),
            partial,
            ..Default::default()
        };

        for diagnostic in diagnostics {
            match diagnostic.kind {
                DiagnosticKind::Skipped(_) => completeness.files_skipped += 1,
                DiagnosticKind::ParseFailure(_) => completeness.parse_failures += 1,
                DiagnosticKind::Abandoned => completeness.abandoned += 1,
                DiagnosticKind::ConsistencyViolation(_) => completeness.consistency_violations += 1,
            }
        }

        for call in graph.calls().iter().filter(|c| !c.is_resolved()) {
            completeness.unresolved_calls += 1;
            if let Some(caller) = graph.symbol(call.caller) {
                completeness
                    .unresolved_by_file
                    .entry(caller.path.clone())
                    .or_default()
                    .unresolved_calls += 1;
            }
        }

        for import in graph.imports().iter().filter(|i| !i.target.is_internal()) {
            completeness.external_imports += 1;
            completeness
                .unresolved_by_file
                .entry(import.source.clone())
                .or_default()
                .external_imports += 1;
        }

        completeness
    }

    /// Nothing skipped, failed, abandoned or left unresolved
    pub fn is_complete(&self) -> bool {
        !self.partial
            && self.files_skipped == 0
            && self.parse_failures == 0
            && self.consistency_violations == 0
            && self.unresolved_calls == 0
    }
}

impl fmt::Display for Completeness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files skipped, {} parse failures, {} unresolved calls",
            self.files_skipped, self.parse_failures, self.unresolved_calls
        )?;
        if self.partial {
            write!(f, " (partial: {} files abandoned)", self.abandoned)?;
        }
        Ok(())
    }
}

/// Result of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub graph: RepositoryGraph,
    pub diagnostics: Vec<Diagnostic>,
    pub completeness: Completeness,
}

/// One record of the JSON Lines output
#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum JsonLine<'a> {
    File(&'a SourceFile),
    Symbol(&'a Symbol),
    Import(&'a ImportEdge),
    Call(&'a CallEdge),
    Diagnostic(&'a Diagnostic),
    Summary {
        completeness: &'a Completeness,
        stats: GraphStats,
    },
}

impl AnalysisReport {
    pub fn new(graph: RepositoryGraph, diagnostics: Vec<Diagnostic>, partial: bool) -> Self {
        let completeness = Completeness::measure(&graph, &diagnostics, partial);
        Self { graph, diagnostics, completeness }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One record per line: files, symbols, imports, calls, diagnostics,
    /// then a summary
    pub fn write_json_lines(&self, mut writer: impl Write) -> Result<()> {
        let graph = &self.graph;
        let records = graph
            .files()
            .iter()
            .map(JsonLine::File)
            .chain(graph.symbols().iter().map(JsonLine::Symbol))
            .chain(graph.imports().iter().map(JsonLine::Import))
            .chain(graph.calls().iter().map(JsonLine::Call))
            .chain(self.diagnostics.iter().map(JsonLine::Diagnostic))
            .chain(std::iter::once(JsonLine::Summary {
                completeness: &self.completeness,
                stats: graph.stats(),
            }));

        for record in records {
            serde_json::to_writer(&mut writer, &record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}
