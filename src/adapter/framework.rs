//! Core adapter framework
//!
//! Defines the trait every language adapter implements and the registry that
//! maps a [`Language`] to its adapter. The extractor, linker and assembler
//! only ever talk to this interface, so a new language never touches them.

use crate::language::Language;
use crate::scope::{CallSite, Import};
use crate::source::parent_dir;
use tree_sitter::Node;

/// How a candidate path is matched against the discovered files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateMatch {
    /// The relative path must be equal
    Exact,
    /// The relative path must end with `/<candidate>` or be equal
    Suffix,
    /// The file's directory must end with `/<candidate>` or be equal
    SuffixDir,
    /// The file's directory must be equal
    Dir,
}

/// A path an import may refer to. Adapters return candidates ordered from
/// most to least specific.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCandidate {
    pub path: String,
    pub matching: CandidateMatch,
}

impl ModuleCandidate {
    pub fn exact(path: impl Into<String>) -> Self {
        Self { path: path.into(), matching: CandidateMatch::Exact }
    }

    pub fn suffix(path: impl Into<String>) -> Self {
        Self { path: path.into(), matching: CandidateMatch::Suffix }
    }

    pub fn suffix_dir(path: impl Into<String>) -> Self {
        Self { path: path.into(), matching: CandidateMatch::SuffixDir }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self { path: path.into(), matching: CandidateMatch::Dir }
    }

    /// Check a discovered file against this candidate
    pub fn matches(&self, file: &str) -> bool {
        let ends_with_segment = |haystack: &str| {
            haystack == self.path
                || (haystack.len() > self.path.len()
                    && haystack.ends_with(self.path.as_str())
                    && haystack.as_bytes()[haystack.len() - self.path.len() - 1] == b'/')
        };
        match self.matching {
            CandidateMatch::Exact => file == self.path,
            CandidateMatch::Suffix => ends_with_segment(file),
            CandidateMatch::SuffixDir => ends_with_segment(parent_dir(file)),
            CandidateMatch::Dir => parent_dir(file) == self.path,
        }
    }
}

/// Kind of a named definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    /// Class, struct, enum, trait, interface
    Class,
    /// Function or method; the walker decides which from context
    Callable,
}

/// A named definition found by an adapter.
#[derive(Debug, Clone)]
pub struct Definition<'t> {
    pub kind: DefinitionKind,
    pub name: String,
    /// Node whose span becomes the symbol's line range
    pub node: Node<'t>,
    /// Node walked for nested definitions and calls
    pub body: Option<Node<'t>>,
    /// Name by which a method body refers to its own instance (`self`, Go receiver)
    pub receiver: Option<String>,
    /// Type the callable belongs to although it is declared outside it (Go methods)
    pub attach_to: Option<String>,
    /// Superclasses, supertraits or embedded types, as written
    pub bases: Vec<String>,
    /// Parameter names in declaration order; Go receivers are not parameters
    pub params: Vec<String>,
}

impl<'t> Definition<'t> {
    pub fn class(name: impl Into<String>, node: Node<'t>, body: Option<Node<'t>>) -> Self {
        Self {
            kind: DefinitionKind::Class,
            name: name.into(),
            node,
            body,
            receiver: None,
            attach_to: None,
            bases: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn callable(name: impl Into<String>, node: Node<'t>, body: Option<Node<'t>>) -> Self {
        Self {
            kind: DefinitionKind::Callable,
            name: name.into(),
            node,
            body,
            receiver: None,
            attach_to: None,
            bases: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn with_receiver(mut self, receiver: Option<String>) -> Self {
        self.receiver = receiver;
        self
    }

    pub fn attached_to(mut self, type_name: impl Into<String>) -> Self {
        self.attach_to = Some(type_name.into());
        self
    }

    pub fn with_bases(mut self, bases: Vec<String>) -> Self {
        self.bases = bases;
        self
    }

    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }
}

/// Role of a syntax node, as seen by the extractor.
#[derive(Debug)]
pub enum NodeRole<'t> {
    Definition(Definition<'t>),
    /// A block whose callables are methods of a type declared elsewhere (Rust `impl`)
    TypeScope { type_name: String, body: Node<'t> },
    Imports(Vec<Import>),
    /// A call; its children are still walked for nested calls
    Call(CallSite),
    Other,
}

/// A module root declared by a manifest in the run (a `go.mod` file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRoot {
    pub language: Language,
    /// Directory holding the manifest, relative to the repository root
    pub dir: String,
    /// Declared module path
    pub name: String,
}

/// Module roots declared in one run.
#[derive(Debug, Clone, Default)]
pub struct ModuleRoots {
    roots: Vec<ModuleRoot>,
}

impl ModuleRoots {
    pub fn new(roots: Vec<ModuleRoot>) -> Self {
        Self { roots }
    }

    /// Ask every adapter whether a file is one of its manifests
    pub fn discover<'i>(
        registry: &AdapterRegistry,
        files: impl IntoIterator<Item = (&'i str, &'i [u8])>,
    ) -> Self {
        let mut roots = Vec::new();
        for (path, content) in files {
            let Ok(text) = std::str::from_utf8(content) else { continue };
            for adapter in registry.adapters() {
                if let Some(name) = adapter.manifest_module(path, text) {
                    tracing::debug!("{} declares module {}", path, name);
                    roots.push(ModuleRoot {
                        language: adapter.language(),
                        dir: parent_dir(path).to_string(),
                        name,
                    });
                }
            }
        }
        Self { roots }
    }

    pub fn for_language(&self, language: Language) -> impl Iterator<Item = &ModuleRoot> {
        self.roots.iter().filter(move |r| r.language == language)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Trait for language adapters
///
/// Each language adapter is responsible for:
/// 1. Providing the tree-sitter grammar
/// 2. Classifying syntax nodes into definitions, imports and calls
/// 3. Describing the language's module-path conventions for import resolution
pub trait LanguageAdapter: Send + Sync {
    /// Language handled by this adapter
    fn language(&self) -> Language;

    /// Tree-sitter grammar
    fn grammar(&self) -> tree_sitter::Language;

    /// Classify one node
    fn classify<'t>(&self, node: Node<'t>, source: &[u8]) -> NodeRole<'t>;

    /// Receivers that always denote the current instance or type
    fn self_receivers(&self) -> &[&str];

    /// Candidate paths for an import, most specific first
    fn module_candidates(&self, importer: &str, import: &Import) -> Vec<ModuleCandidate>;

    /// Candidate paths knowing the module roots declared in the run
    fn module_candidates_in(
        &self,
        importer: &str,
        import: &Import,
        _roots: &ModuleRoots,
    ) -> Vec<ModuleCandidate> {
        self.module_candidates(importer, import)
    }

    /// Module path declared by `path` if it is one of this language's manifests
    fn manifest_module(&self, _path: &str, _text: &str) -> Option<String> {
        None
    }

    /// Top-level package name used when an import is external
    fn external_package(&self, import: &Import) -> String;

    /// Dotted module name of a file (`pkg/util.py` → `pkg.util`)
    fn module_name(&self, path: &str) -> String {
        let stem = path.rsplit_once('.').map(|(s, _)| s).unwrap_or(path);
        stem.replace('/', ".")
    }
}

/// Registry of language adapters
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn LanguageAdapter>>,
}

impl AdapterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter
    pub fn register(&mut self, adapter: impl LanguageAdapter + 'static) {
        self.adapters.push(Box::new(adapter));
    }

    /// Find the adapter for a language
    pub fn for_language(&self, language: Language) -> Option<&dyn LanguageAdapter> {
        self.adapters
            .iter()
            .find(|a| a.language() == language)
            .map(|a| a.as_ref())
    }

    /// Get all registered adapters
    pub fn adapters(&self) -> &[Box<dyn LanguageAdapter>] {
        &self.adapters
    }
}

/// Create a default registry with all built-in adapters
pub fn default_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(super::python::PythonAdapter);
    registry.register(super::javascript::JavaScriptAdapter);
    registry.register(super::rust::RustAdapter);
    registry.register(super::go::GoAdapter);
    registry
}

/// UTF-8 text of a node (empty on invalid ranges)
pub fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

/// 1-indexed start line of a node
pub fn start_line(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

/// 1-indexed end line of a node
pub fn end_line(node: Node<'_>) -> u32 {
    node.end_position().row as u32 + 1
}

/// Strip one layer of matching string quotes
pub fn unquote(text: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}

/// Join a `/`-separated relative reference onto a directory, folding `.` and
/// `..`. Returns `None` when the reference climbs above the repository root.
pub fn join_relative(dir: &str, reference: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in reference.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Join non-empty path pieces with `/`
pub fn join_path(pieces: &[&str]) -> String {
    pieces
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}
