//! Graph assembly
//!
//! Per-file records reference symbols by [`SymbolUri`]; the assembler checks
//! them against each other, drops anything that would break a graph
//! invariant and assigns dense [`SymbolId`]s in (path, source) order.

use crate::diagnostics::Diagnostic;
use crate::edge::{CallEdge, Callee, ImportEdge, ImportTarget};
use crate::extract::ExtractedFile;
use crate::graph::RepositoryGraph;
use crate::linker::{CallResolution, LinkedFile};
use crate::source::SourceFile;
use crate::symbol::{Symbol, SymbolId, SymbolKind};
use crate::uri::SymbolUri;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A symbol as recorded for one file. Kind, path, qualified name and start
/// position live in the URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    pub uri: SymbolUri,
    pub name: String,
    pub line_end: u32,
    pub owner: Option<SymbolUri>,
    pub bases: Vec<String>,
    pub params: Vec<String>,
}

/// Callee of a recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalleeRef {
    Symbol(SymbolUri),
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    pub caller: SymbolUri,
    pub callee: CalleeRef,
    pub line: u32,
}

/// Everything one file contributes to the graph.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub file: SourceFile,
    pub symbols: Vec<SymbolRecord>,
    pub imports: Vec<ImportEdge>,
    pub calls: Vec<PendingCall>,
}

/// URIs of one file's symbols. The start column is added only where kind,
/// qualified name and line together are not unique.
fn symbol_uris(repo: &str, file: &ExtractedFile) -> Vec<SymbolUri> {
    let mut seen: HashMap<(SymbolKind, &str, u32), usize> = HashMap::new();
    for symbol in &file.facts.symbols {
        let key = (symbol.kind, symbol.qualified_name.as_str(), symbol.line_start);
        *seen.entry(key).or_default() += 1;
    }
    file.facts
        .symbols
        .iter()
        .map(|s| {
            let uri =
                SymbolUri::new(repo, &file.file.path, s.kind, &s.qualified_name, s.line_start);
            match seen.get(&(s.kind, s.qualified_name.as_str(), s.line_start)) {
                Some(&count) if count > 1 => uri.with_column(s.column),
                _ => uri,
            }
        })
        .collect()
}

/// Turn linked files into URI-keyed records. `files` and `linked` are
/// index-aligned.
pub fn build_records(
    repo: &str,
    files: Vec<ExtractedFile>,
    linked: Vec<LinkedFile>,
) -> Vec<FileRecord> {
    let uris: Vec<Vec<SymbolUri>> = files.iter().map(|f| symbol_uris(repo, f)).collect();

    files
        .into_iter()
        .zip(linked)
        .enumerate()
        .map(|(index, (extracted, linked))| {
            let file_uris = &uris[index];
            let symbols = extracted
                .facts
                .symbols
                .iter()
                .zip(file_uris)
                .map(|(symbol, uri)| SymbolRecord {
                    uri: uri.clone(),
                    name: symbol.name.clone(),
                    line_end: symbol.line_end,
                    owner: symbol.owner.map(|o| file_uris[o].clone()),
                    bases: symbol.bases.clone(),
                    params: symbol.params.clone(),
                })
                .collect();

            let calls = linked
                .calls
                .into_iter()
                .map(|call| PendingCall {
                    caller: file_uris[call.caller].clone(),
                    callee: match call.callee {
                        CallResolution::Symbol { file, symbol } => {
                            CalleeRef::Symbol(uris[file][symbol].clone())
                        }
                        CallResolution::Unresolved(text) => CalleeRef::Unresolved(text),
                    },
                    line: call.line,
                })
                .collect();

            FileRecord {
                file: extracted.file,
                symbols,
                imports: linked.imports,
                calls,
            }
        })
        .collect()
}

/// Collects file records and freezes them into a [`RepositoryGraph`].
#[derive(Debug, Default)]
pub struct GraphAssembler {
    records: BTreeMap<String, FileRecord>,
}

impl GraphAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file's record, replacing any earlier record for the same path
    pub fn add_file(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.records.insert(record.file.path.clone(), record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Validate every record and build the frozen graph
    pub fn finish(self) -> (RepositoryGraph, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let mut violation = |path: &str, message: String| {
            tracing::error!("Consistency violation in {}: {}", path, message);
            diagnostics.push(Diagnostic::violation(path, message));
        };

        let paths: HashSet<String> = self.records.keys().cloned().collect();

        // Symbols
        let mut symbols: Vec<Symbol> = Vec::new();
        let mut ids: HashMap<SymbolUri, SymbolId> = HashMap::new();
        let mut owners: Vec<(SymbolId, &SymbolUri)> = Vec::new();
        for (path, record) in &self.records {
            let accepted = accepted_symbols(path, &record.symbols, &mut violation);
            let kept = record.symbols.iter().zip(accepted).filter(|(_, ok)| *ok);
            for (symbol, _) in kept {
                let id = SymbolId(symbols.len() as u32);
                ids.insert(symbol.uri.clone(), id);
                if let Some(owner) = &symbol.owner {
                    owners.push((id, owner));
                }
                symbols.push(Symbol {
                    id,
                    uri: symbol.uri.clone(),
                    kind: symbol.uri.kind,
                    name: symbol.name.clone(),
                    qualified_name: symbol.uri.qualified_name.clone(),
                    path: path.clone(),
                    line_start: symbol.uri.line,
                    line_end: symbol.line_end,
                    owner: None,
                    bases: symbol.bases.clone(),
                    params: symbol.params.clone(),
                });
            }
        }
        for (id, owner) in owners {
            symbols[id.index()].owner = ids.get(owner).copied();
        }

        // Imports
        let mut imports = Vec::new();
        let mut reachable: HashMap<&str, HashSet<String>> = HashMap::new();
        for (path, record) in &self.records {
            let mut file_imports = record.imports.clone();
            file_imports.sort_by_key(|i| i.line);
            for mut import in file_imports {
                if import.source != *path {
                    let message = format!(
                        "import at line {} claims source {}",
                        import.line, import.source
                    );
                    violation(path, message);
                    import.source = path.clone();
                }
                if let ImportTarget::Internal(target) = &import.target {
                    if !paths.contains(target) {
                        violation(path, format!("import target {} is not part of the run", target));
                        import.target = ImportTarget::External(import.module.clone());
                    }
                }
                if let Some(target) = import.target.internal_path() {
                    reachable.entry(path.as_str()).or_default().insert(target.to_string());
                }
                imports.push(import);
            }
        }

        // Calls
        let mut calls = Vec::new();
        for (path, record) in &self.records {
            let mut file_calls = record.calls.clone();
            file_calls.sort_by_key(|c| c.line);
            for call in file_calls {
                let caller = ids
                    .get(&call.caller)
                    .copied()
                    .filter(|id| {
                        let symbol = &symbols[id.index()];
                        symbol.kind.is_callable() && symbol.path == *path
                    });
                let Some(caller) = caller else {
                    let message = format!(
                        "call at line {} has no callable caller {}",
                        call.line, call.caller
                    );
                    violation(path, message);
                    continue;
                };

                let callee = match call.callee {
                    CalleeRef::Unresolved(text) => Callee::Unresolved(text),
                    CalleeRef::Symbol(uri) => {
                        let in_reach = uri.path == *path
                            || reachable.get(path.as_str()).is_some_and(|r| r.contains(&uri.path));
                        match ids.get(&uri) {
                            Some(&id) if in_reach => Callee::Resolved(id),
                            _ => {
                                let message = format!(
                                    "call at line {} resolves to unreachable {}",
                                    call.line, uri
                                );
                                violation(path, message);
                                continue;
                            }
                        }
                    }
                };
                calls.push(CallEdge::new(caller, callee, call.line));
            }
        }

        let files = self.records.into_values().map(|r| r.file).collect();
        (RepositoryGraph::from_parts(files, symbols, imports, calls), diagnostics)
    }
}

/// Which of a file's symbols satisfy the per-symbol invariants: the path
/// matches, spans are ordered, URIs are unique and every owner chain stays in
/// the file and ends at its Module symbol. Index-aligned with `symbols`.
fn accepted_symbols(
    path: &str,
    symbols: &[SymbolRecord],
    violation: &mut impl FnMut(&str, String),
) -> Vec<bool> {
    let mut candidates: HashMap<&SymbolUri, usize> = HashMap::new();
    let mut valid = vec![false; symbols.len()];
    for (index, symbol) in symbols.iter().enumerate() {
        let problem = if symbol.uri.path != path {
            Some(format!("symbol {} belongs to another file", symbol.uri))
        } else if symbol.uri.line == 0 || symbol.uri.line > symbol.line_end {
            Some(format!("symbol {} has span {}..{}", symbol.uri, symbol.uri.line, symbol.line_end))
        } else if candidates.contains_key(&symbol.uri) {
            Some(format!("duplicate symbol {}", symbol.uri))
        } else if (symbol.uri.kind == SymbolKind::Module) != symbol.owner.is_none() {
            Some(format!("symbol {} has an invalid owner", symbol.uri))
        } else {
            None
        };
        match problem {
            Some(message) => violation(path, message),
            None => {
                candidates.insert(&symbol.uri, index);
                valid[index] = true;
            }
        }
    }

    let mut accepted = vec![false; symbols.len()];
    for (index, symbol) in symbols.iter().enumerate() {
        if !valid[index] {
            continue;
        }
        let mut current = symbol;
        let mut steps = 0;
        let rooted = loop {
            match &current.owner {
                None => break current.uri.kind == SymbolKind::Module,
                Some(owner) => match candidates.get(owner) {
                    Some(&next) if steps < candidates.len() => {
                        current = &symbols[next];
                        steps += 1;
                    }
                    _ => break false,
                },
            }
        };
        if rooted {
            accepted[index] = true;
        } else {
            violation(path, format!("symbol {} is not owned within its file", symbol.uri));
        }
    }
    accepted
}
