//! Import classification and per-file binding tables
//!
//! An import is internal when one of the adapter's candidate paths matches a
//! file in the run. Candidates are tried most specific first; the first one
//! that matches anything wins, and ties inside a candidate go to the shortest
//! path, then the lexically smallest. Anything unmatched is external and
//! named by its top-level package.

use super::Linker;
use crate::adapter::{CandidateMatch, LanguageAdapter};
use crate::edge::{ImportEdge, ImportTarget};
use crate::scope::{BindingKind, Import};
use std::collections::HashMap;

/// What a local name refers to through an internal import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundName {
    /// A whole module (file index)
    Module(usize),
    /// A named member of a module
    Member { file: usize, member: String },
}

/// Names a file binds through its internal imports.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    names: HashMap<String, BoundName>,
    /// Targets of wildcard imports, in import order
    wildcards: Vec<usize>,
}

impl BindingTable {
    pub fn get(&self, local: &str) -> Option<&BoundName> {
        self.names.get(local)
    }

    pub fn wildcards(&self) -> &[usize] {
        &self.wildcards
    }
}

impl<'a> Linker<'a> {
    /// Classify every import of a file, in extraction order
    pub(super) fn classify_imports(
        &self,
        index: usize,
        adapter: &dyn LanguageAdapter,
    ) -> Vec<ImportEdge> {
        let importer = &self.files[index].file;
        self.files[index]
            .facts
            .imports
            .iter()
            .map(|import| {
                let target = match self.find_module(index, import, adapter) {
                    Some(found) => ImportTarget::Internal(self.files[found].file.path.clone()),
                    None => ImportTarget::External(adapter.external_package(import)),
                };
                ImportEdge {
                    source: importer.path.clone(),
                    raw: import.raw.clone(),
                    module: import.module.clone(),
                    target,
                    line: import.line,
                }
            })
            .collect()
    }

    /// File an import refers to, if it is part of the run
    fn find_module(
        &self,
        index: usize,
        import: &Import,
        adapter: &dyn LanguageAdapter,
    ) -> Option<usize> {
        let importer = &self.files[index].file;

        for candidate in adapter.module_candidates_in(&importer.path, import, &self.roots) {
            let found = if candidate.matching == CandidateMatch::Exact {
                self.by_path
                    .get(candidate.path.as_str())
                    .copied()
                    .filter(|&i| self.files[i].file.language == importer.language)
            } else {
                self.files
                    .iter()
                    .enumerate()
                    .filter(|(_, f)| {
                        f.file.language == importer.language && candidate.matches(&f.file.path)
                    })
                    .min_by(|(_, a), (_, b)| {
                        (a.file.path.len(), &a.file.path).cmp(&(b.file.path.len(), &b.file.path))
                    })
                    .map(|(i, _)| i)
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Build the local names a file binds. Later imports shadow earlier ones,
    /// including external imports shadowing internal names.
    pub(super) fn bind(
        &self,
        index: usize,
        adapter: &dyn LanguageAdapter,
        edges: &[ImportEdge],
    ) -> BindingTable {
        let mut table = BindingTable::default();

        for (import, edge) in self.files[index].facts.imports.iter().zip(edges) {
            let target = edge
                .target
                .internal_path()
                .and_then(|path| self.by_path.get(path).copied());

            for binding in &import.bindings {
                match (&binding.kind, target) {
                    (BindingKind::Wildcard, Some(file)) => table.wildcards.push(file),
                    (BindingKind::Wildcard, None) => {}
                    (_, None) => {
                        table.names.remove(&binding.local);
                    }
                    (BindingKind::Module, Some(file)) => {
                        table.names.insert(binding.local.clone(), BoundName::Module(file));
                    }
                    (BindingKind::Member(member), Some(file)) => {
                        let bound = self.bind_member(file, member, adapter);
                        table.names.insert(binding.local.clone(), bound);
                    }
                }
            }
        }
        table
    }

    /// A member binding that names the module it resolved to is a module
    /// alias: `from pkg import util` → `pkg/util.py`, `use crate::util;`
    fn bind_member(&self, file: usize, member: &str, adapter: &dyn LanguageAdapter) -> BoundName {
        let target = &self.files[file];
        if target.facts.top_level(member).is_none()
            && adapter.module_name(&target.file.path).rsplit('.').next() == Some(member)
        {
            return BoundName::Module(file);
        }
        BoundName::Member { file, member: member.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{default_registry, ModuleRoot, ModuleRoots};
    use crate::language::Language;
    use crate::linker::test_support::extracted;

    #[test]
    fn test_internal_and_external_imports() {
        let files = extracted(&[
            ("main.py", "import os\nimport greeter\nfrom math_utils import add\n"),
            ("greeter.py", "def greet():\n    pass\n"),
            ("math_utils.py", "def add(a, b):\n    return a + b\n"),
        ]);
        let registry = default_registry();
        let linker = Linker::new(&files, &registry);
        let main = files.iter().position(|f| f.file.path == "main.py").unwrap();
        let adapter = registry.for_language(files[main].file.language).unwrap();

        let edges = linker.classify_imports(main, adapter);
        let targets: Vec<_> = edges.iter().map(|e| e.target.to_string()).collect();
        assert_eq!(
            targets,
            vec!["external:os", "internal:greeter.py", "internal:math_utils.py"]
        );
        assert!(edges.iter().all(|e| e.source == "main.py"));
    }

    #[test]
    fn test_most_specific_candidate_wins() {
        let files = extracted(&[
            ("app/main.py", "import util\n"),
            ("app/util.py", "x = 1\n"),
            ("util.py", "x = 2\n"),
        ]);
        let registry = default_registry();
        let linker = Linker::new(&files, &registry);
        let main = files.iter().position(|f| f.file.path == "app/main.py").unwrap();
        let adapter = registry.for_language(files[main].file.language).unwrap();
        let edges = linker.classify_imports(main, adapter);
        assert_eq!(edges[0].target, ImportTarget::Internal("app/util.py".to_string()));
    }

    #[test]
    fn test_suffix_ties_break_on_shortest_path() {
        let files = extracted(&[
            ("main.py", "import core.db\n"),
            ("svc/b/core/db.py", "x = 1\n"),
            ("svc/core/db.py", "x = 1\n"),
        ]);
        let registry = default_registry();
        let linker = Linker::new(&files, &registry);
        let main = files.iter().position(|f| f.file.path == "main.py").unwrap();
        let adapter = registry.for_language(files[main].file.language).unwrap();
        let edges = linker.classify_imports(main, adapter);
        assert_eq!(edges[0].target, ImportTarget::Internal("svc/core/db.py".to_string()));
    }

    #[test]
    fn test_member_binding_to_submodule() {
        let files = extracted(&[
            ("pkg/__init__.py", ""),
            ("pkg/util.py", "def run():\n    pass\n"),
            ("main.py", "from pkg import util\n"),
        ]);
        let registry = default_registry();
        let linker = Linker::new(&files, &registry);
        let main = files.iter().position(|f| f.file.path == "main.py").unwrap();
        let util = files.iter().position(|f| f.file.path == "pkg/util.py").unwrap();
        let adapter = registry.for_language(files[main].file.language).unwrap();

        let edges = linker.classify_imports(main, adapter);
        let table = linker.bind(main, adapter, &edges);
        assert_eq!(table.get("util"), Some(&BoundName::Module(util)));
    }

    #[test]
    fn test_external_import_shadows_internal_name() {
        let files = extracted(&[
            ("main.py", "from helpers import parse\nfrom json import parse\n"),
            ("helpers.py", "def parse():\n    pass\n"),
        ]);
        let registry = default_registry();
        let linker = Linker::new(&files, &registry);
        let main = files.iter().position(|f| f.file.path == "main.py").unwrap();
        let adapter = registry.for_language(files[main].file.language).unwrap();
        let edges = linker.classify_imports(main, adapter);
        assert_eq!(linker.bind(main, adapter, &edges).get("parse"), None);
    }

    #[test]
    fn test_go_imports_outside_declared_module_are_external() {
        let files = extracted(&[
            (
                "cmd/main.go",
                "package main\n\nimport (\n    \"github.com/acme/app/internal/util\"\n    \"github.com/pkg/errors\"\n)\n",
            ),
            ("internal/util/util.go", "package util\n\nfunc Join() {}\n"),
            ("pkg/errors/errors.go", "package errors\n\nfunc Wrap() {}\n"),
        ]);
        let registry = default_registry();
        let roots = ModuleRoots::new(vec![ModuleRoot {
            language: Language::Go,
            dir: String::new(),
            name: "github.com/acme/app".to_string(),
        }]);
        let linker = Linker::new(&files, &registry).with_module_roots(roots);
        let main = files.iter().position(|f| f.file.path == "cmd/main.go").unwrap();
        let edges = linker.classify_imports(main, registry.for_language(Language::Go).unwrap());

        assert_eq!(edges[0].target, ImportTarget::Internal("internal/util/util.go".to_string()));
        assert_eq!(edges[1].target, ImportTarget::External("github.com/pkg/errors".to_string()));
    }
}
