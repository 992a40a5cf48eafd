//! Cross-file linking
//!
//! Runs once every file has been extracted. Classifies each import as
//! internal or external, builds the names each file binds through its
//! imports and resolves call sites against those bindings.

pub mod imports;
pub mod calls;

pub use calls::CallResolution;
pub use imports::{BindingTable, BoundName};

use crate::adapter::{AdapterRegistry, LanguageAdapter, ModuleRoots};
use crate::edge::ImportEdge;
use crate::extract::ExtractedFile;
use std::collections::HashMap;
use std::fmt;

/// A call site with its callee resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedCall {
    /// Index of the caller within its file's symbols
    pub caller: usize,
    pub callee: CallResolution,
    pub line: u32,
}

/// Link results for one file, aligned with the linker's input order.
#[derive(Debug, Clone, Default)]
pub struct LinkedFile {
    pub imports: Vec<ImportEdge>,
    pub calls: Vec<LinkedCall>,
}

impl LinkedFile {
    pub fn unresolved_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c.callee, CallResolution::Unresolved(_)))
            .count()
    }

    pub fn external_imports(&self) -> usize {
        self.imports.iter().filter(|i| !i.target.is_internal()).count()
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LinkerStats {
    pub internal_imports: usize,
    pub external_imports: usize,
    pub resolved_calls: usize,
    pub unresolved_calls: usize,
}

impl fmt::Display for LinkerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Linker Stats:")?;
        writeln!(f, "  Internal Imports: {}", self.internal_imports)?;
        writeln!(f, "  External Imports: {}", self.external_imports)?;
        writeln!(f, "  Resolved Calls: {}", self.resolved_calls)?;
        write!(f, "  Unresolved Calls: {}", self.unresolved_calls)
    }
}

/// Resolves imports and calls across a complete, path-sorted set of files.
pub struct Linker<'a> {
    files: &'a [ExtractedFile],
    registry: &'a AdapterRegistry,
    /// Path → file index
    by_path: HashMap<&'a str, usize>,
    /// Module roots declared by manifests in the run
    roots: ModuleRoots,
}

impl<'a> Linker<'a> {
    pub fn new(files: &'a [ExtractedFile], registry: &'a AdapterRegistry) -> Self {
        let by_path = files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.file.path.as_str(), i))
            .collect();

        Self {
            files,
            registry,
            by_path,
            roots: ModuleRoots::default(),
        }
    }

    pub fn with_module_roots(mut self, roots: ModuleRoots) -> Self {
        self.roots = roots;
        self
    }

    fn adapter(&self, file: usize) -> Option<&'a dyn LanguageAdapter> {
        self.registry.for_language(self.files[file].file.language)
    }

    /// Link every file. The output is index-aligned with the input.
    pub fn run(&self) -> (Vec<LinkedFile>, LinkerStats) {
        let mut stats = LinkerStats::default();
        let mut linked = Vec::with_capacity(self.files.len());

        for index in 0..self.files.len() {
            let Some(adapter) = self.adapter(index) else {
                linked.push(LinkedFile::default());
                continue;
            };

            let imports = self.classify_imports(index, adapter);
            let bindings = self.bind(index, adapter, &imports);
            let calls = self.resolve_calls(index, &bindings);

            let file = LinkedFile { imports, calls };
            let unresolved = file.unresolved_calls();
            let external = file.external_imports();
            stats.external_imports += external;
            stats.internal_imports += file.imports.len() - external;
            stats.unresolved_calls += unresolved;
            stats.resolved_calls += file.calls.len() - unresolved;
            linked.push(file);
        }

        tracing::debug!("{}", stats);
        (linked, stats)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::adapter::default_registry;
    use crate::extract::{extract, ExtractedFile};
    use crate::language::{detect, Detection, DetectorConfig};
    use crate::parser::parse_source;
    use crate::source::SourceFile;

    /// Parse and extract an in-memory repository, sorted by path
    pub fn extracted(files: &[(&str, &str)]) -> Vec<ExtractedFile> {
        let registry = default_registry();
        let mut out: Vec<ExtractedFile> = files
            .iter()
            .map(|(path, text)| {
                let Detection::Supported(language) =
                    detect(path, text.as_bytes(), &DetectorConfig::default())
                else {
                    panic!("unsupported test file {}", path);
                };
                let adapter = registry.for_language(language).unwrap();
                let file = SourceFile::new(*path, language, *text);
                let tree = parse_source(&file, adapter, None).unwrap();
                let facts = extract(&file, &tree, adapter);
                ExtractedFile { file, facts }
            })
            .collect();
        out.sort_by(|a, b| a.file.path.cmp(&b.file.path));
        out
    }
}
