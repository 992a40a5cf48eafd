//! Repository Graph - the frozen result of an analysis run
//!
//! Built once by the [`GraphAssembler`](crate::assembler::GraphAssembler) and
//! read-only afterwards. Symbols are stored densely, so a [`SymbolId`] is an
//! index into the symbol table.

use crate::edge::{CallEdge, ImportEdge};
use crate::source::SourceFile;
use crate::symbol::{Symbol, SymbolId, SymbolKind};
use crate::uri::SymbolUri;
use serde::Serialize;
use std::collections::HashMap;

/// Files, symbols, imports and calls of one repository.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepositoryGraph {
    files: Vec<SourceFile>,
    symbols: Vec<Symbol>,
    imports: Vec<ImportEdge>,
    calls: Vec<CallEdge>,
    #[serde(skip)]
    by_uri: HashMap<SymbolUri, SymbolId>,
}

impl RepositoryGraph {
    /// Assemble a graph from already-validated parts
    pub(crate) fn from_parts(
        files: Vec<SourceFile>,
        symbols: Vec<Symbol>,
        imports: Vec<ImportEdge>,
        calls: Vec<CallEdge>,
    ) -> Self {
        let by_uri = symbols.iter().map(|s| (s.uri.clone(), s.id)).collect();
        Self { files, symbols, imports, calls, by_uri }
    }

    /// Analyzed files, sorted by path
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// All symbols in id order
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn imports(&self) -> &[ImportEdge] {
        &self.imports
    }

    pub fn calls(&self) -> &[CallEdge] {
        &self.calls
    }

    /// Get a symbol by id
    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    /// Get a symbol by its URI
    pub fn get_symbol(&self, uri: &SymbolUri) -> Option<&Symbol> {
        self.by_uri.get(uri).and_then(|id| self.symbol(*id))
    }

    /// Get a file by path
    pub fn file(&self, path: &str) -> Option<&SourceFile> {
        self.files
            .binary_search_by(|f| f.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.files[i])
    }

    /// Get all symbols in a file, in source order
    pub fn symbols_in_file(&self, path: &str) -> Vec<&Symbol> {
        self.symbols.iter().filter(|s| s.path == path).collect()
    }

    /// Get all symbols with a given name
    pub fn find_by_name(&self, name: &str) -> Vec<&Symbol> {
        self.symbols.iter().filter(|s| s.name == name).collect()
    }

    /// Symbols directly owned by `owner`
    pub fn children(&self, owner: SymbolId) -> Vec<&Symbol> {
        self.symbols.iter().filter(|s| s.owner == Some(owner)).collect()
    }

    /// Imports made by a file
    pub fn imports_from(&self, path: &str) -> Vec<&ImportEdge> {
        self.imports.iter().filter(|i| i.source == path).collect()
    }

    /// Find all callers of a callable
    pub fn find_callers(&self, id: SymbolId) -> Vec<&Symbol> {
        self.calls
            .iter()
            .filter(|c| c.callee.symbol() == Some(id))
            .filter_map(|c| self.symbol(c.caller))
            .collect()
    }

    /// Find all resolved callees of a callable
    pub fn find_callees(&self, id: SymbolId) -> Vec<&Symbol> {
        self.calls
            .iter()
            .filter(|c| c.caller == id)
            .filter_map(|c| c.callee.symbol())
            .filter_map(|callee| self.symbol(callee))
            .collect()
    }

    /// Get statistics about the graph
    pub fn stats(&self) -> GraphStats {
        let count = |kind: SymbolKind| self.symbols.iter().filter(|s| s.kind == kind).count();
        let resolved_calls = self.calls.iter().filter(|c| c.is_resolved()).count();
        let internal_imports = self.imports.iter().filter(|i| i.target.is_internal()).count();

        GraphStats {
            files: self.files.len(),
            modules: count(SymbolKind::Module),
            classes: count(SymbolKind::Class),
            functions: count(SymbolKind::Function),
            methods: count(SymbolKind::Method),
            internal_imports,
            external_imports: self.imports.len() - internal_imports,
            resolved_calls,
            unresolved_calls: self.calls.len() - resolved_calls,
        }
    }
}

/// Statistics about a repository graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub files: usize,
    pub modules: usize,
    pub classes: usize,
    pub functions: usize,
    pub methods: usize,
    pub internal_imports: usize,
    pub external_imports: usize,
    pub resolved_calls: usize,
    pub unresolved_calls: usize,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Repository Graph Statistics:")?;
        writeln!(f, "  Files: {}", self.files)?;
        writeln!(
            f,
            "  Symbols: {} modules, {} classes, {} functions, {} methods",
            self.modules, self.classes, self.functions, self.methods
        )?;
        writeln!(
            f,
            "  Imports: {} internal, {} external",
            self.internal_imports, self.external_imports
        )?;
        writeln!(
            f,
            "  Calls: {} resolved, {} unresolved",
            self.resolved_calls, self.unresolved_calls
        )
    }
}
