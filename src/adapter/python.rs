//! Python language adapter
//!
//! Classifies Python syntax nodes and implements Python's module-path
//! conventions: dotted absolute imports, leading-dot relative imports,
//! `__init__.py` packages and script-style sibling imports.

use crate::language::Language;
use crate::scope::{Binding, BindingKind, CallSite, CallTarget, Import};
use crate::source::parent_dir;
use super::framework::{
    join_path, join_relative, node_text, start_line, CandidateMatch, Definition,
    LanguageAdapter, ModuleCandidate, NodeRole,
};
use tree_sitter::Node;

/// Python language adapter
pub struct PythonAdapter;

impl PythonAdapter {
    /// `import a.b`, `import a.b as c` (one Import per reference)
    fn extract_import(node: Node, source: &[u8]) -> Vec<Import> {
        let raw = node_text(node, source);
        let line = start_line(node);
        let mut imports = Vec::new();
        let mut cursor = node.walk();

        for child in node.children_by_field_name("name", &mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    let module = node_text(child, source);
                    let import =
                        Import::new(raw, module, line).with_binding(Binding::module(module));
                    imports.push(import);
                }
                "aliased_import" => {
                    let Some(name) = child.child_by_field_name("name") else { continue };
                    let module = node_text(name, source);
                    let mut import = Import::new(raw, module, line);
                    if let Some(alias) = child.child_by_field_name("alias") {
                        import = import.with_binding(Binding::module(node_text(alias, source)));
                    }
                    imports.push(import);
                }
                _ => {}
            }
        }
        imports
    }

    /// `from m import a, b as c`, `from . import x`, `from m import *`
    fn extract_from_import(node: Node, source: &[u8]) -> Vec<Import> {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return Vec::new();
        };
        let mut import = Import::new(
            node_text(node, source),
            node_text(module_node, source),
            start_line(node),
        );

        let mut cursor = node.walk();
        for child in node.children_by_field_name("name", &mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    let name = node_text(child, source);
                    import = import.with_binding(Binding::member(name, name));
                }
                "aliased_import" => {
                    let name = child.child_by_field_name("name").map(|n| node_text(n, source));
                    let alias = child.child_by_field_name("alias").map(|n| node_text(n, source));
                    if let (Some(name), Some(alias)) = (name, alias) {
                        import = import.with_binding(Binding::member(alias, name));
                    }
                }
                _ => {}
            }
        }

        let mut cursor = node.walk();
        if node.named_children(&mut cursor).any(|c| c.kind() == "wildcard_import") {
            import = import.with_binding(Binding::wildcard());
        }

        vec![import]
    }

    fn extract_call(node: Node, source: &[u8]) -> Option<CallSite> {
        let function = node.child_by_field_name("function")?;
        let text = node_text(function, source);
        let line = start_line(node);

        let target = match function.kind() {
            "identifier" => CallTarget::Name(text.to_string()),
            "attribute" => {
                let object = function.child_by_field_name("object")?;
                let attribute = function.child_by_field_name("attribute")?;
                if object.kind() == "identifier" {
                    CallTarget::Member {
                        receiver: node_text(object, source).to_string(),
                        name: node_text(attribute, source).to_string(),
                    }
                } else {
                    CallTarget::Dynamic
                }
            }
            _ => CallTarget::Dynamic,
        };
        Some(CallSite::new(target, text, line))
    }

    /// `class C(Base, mixins.Log, metaclass=M)` → `[Base, mixins.Log]`
    fn superclasses(node: Node, source: &[u8]) -> Vec<String> {
        let Some(list) = node.child_by_field_name("superclasses") else {
            return Vec::new();
        };
        let mut cursor = list.walk();
        list.named_children(&mut cursor)
            .filter(|c| !matches!(c.kind(), "keyword_argument" | "comment"))
            .map(|c| node_text(c, source).to_string())
            .collect()
    }

    /// `(self, x: int, y=1, *args, **kw)` → `[self, x, y, *args, **kw]`
    fn parameters(node: Node, source: &[u8]) -> Vec<String> {
        let Some(list) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut cursor = list.walk();
        list.named_children(&mut cursor)
            .filter_map(|param| match param.kind() {
                "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" => Some(param),
                "default_parameter" | "typed_default_parameter" => {
                    param.child_by_field_name("name")
                }
                "typed_parameter" => param.named_child(0),
                _ => None,
            })
            .map(|name| node_text(name, source).to_string())
            .collect()
    }

    /// `pkg/mod` → `[pkg/mod.py, pkg/mod/__init__.py]`
    fn module_files(base: &str) -> [String; 2] {
        [format!("{}.py", base), join_path(&[base, "__init__.py"])]
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn classify<'t>(&self, node: Node<'t>, source: &[u8]) -> NodeRole<'t> {
        match node.kind() {
            "class_definition" => match node.child_by_field_name("name") {
                Some(name) => {
                    let body = node.child_by_field_name("body");
                    NodeRole::Definition(
                        Definition::class(node_text(name, source), node, body)
                            .with_bases(Self::superclasses(node, source)),
                    )
                }
                None => NodeRole::Other,
            },
            "function_definition" => match node.child_by_field_name("name") {
                Some(name) => {
                    let body = node.child_by_field_name("body");
                    NodeRole::Definition(
                        Definition::callable(node_text(name, source), node, body)
                            .with_params(Self::parameters(node, source)),
                    )
                }
                None => NodeRole::Other,
            },
            "import_statement" => NodeRole::Imports(Self::extract_import(node, source)),
            "import_from_statement" => NodeRole::Imports(Self::extract_from_import(node, source)),
            "call" => Self::extract_call(node, source)
                .map(NodeRole::Call)
                .unwrap_or(NodeRole::Other),
            _ => NodeRole::Other,
        }
    }

    fn self_receivers(&self) -> &[&str] {
        &["self", "cls"]
    }

    fn module_candidates(&self, importer: &str, import: &Import) -> Vec<ModuleCandidate> {
        let dots = import.module.chars().take_while(|c| *c == '.').count();
        let rest = import.module[dots..].replace('.', "/");
        let submodule = import.bindings.iter().find_map(|b| match &b.kind {
            BindingKind::Member(member) => Some(member.clone()),
            _ => None,
        });

        // (matching, base directory) pairs, most specific first
        let anchors: Vec<(CandidateMatch, String)> = if dots > 0 {
            let climb = "../".repeat(dots - 1);
            match join_relative(parent_dir(importer), &climb) {
                Some(base) => vec![(CandidateMatch::Exact, base)],
                None => return Vec::new(),
            }
        } else {
            vec![
                (CandidateMatch::Exact, parent_dir(importer).to_string()),
                (CandidateMatch::Exact, String::new()),
                (CandidateMatch::Suffix, String::new()),
            ]
        };

        let mut candidates: Vec<ModuleCandidate> = Vec::new();
        let mut push = |matching: CandidateMatch, path: String| {
            let candidate = ModuleCandidate { path, matching };
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        };

        // `from pkg import util` prefers the submodule `pkg/util.py`
        for (matching, base) in &anchors {
            if let Some(member) = &submodule {
                let base = join_path(&[base.as_str(), rest.as_str(), member.as_str()]);
                for file in Self::module_files(&base) {
                    push(*matching, file);
                }
            }
            if rest.is_empty() {
                push(*matching, join_path(&[base.as_str(), "__init__.py"]));
            } else {
                for file in Self::module_files(&join_path(&[base.as_str(), rest.as_str()])) {
                    push(*matching, file);
                }
            }
        }
        candidates
    }

    fn external_package(&self, import: &Import) -> String {
        let trimmed = import.module.trim_start_matches('.');
        match trimmed.split('.').next() {
            Some(first) if !first.is_empty() && trimmed.len() == import.module.len() => {
                first.to_string()
            }
            _ => import.module.clone(),
        }
    }

    fn module_name(&self, path: &str) -> String {
        let stem = path
            .strip_suffix(".pyi")
            .or_else(|| path.strip_suffix(".py"))
            .unwrap_or(path);
        let stem = stem.strip_suffix("/__init__").unwrap_or(stem);
        stem.replace('/', ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use crate::parser::parse_source;
    use crate::source::SourceFile;
    use crate::symbol::SymbolKind;

    fn facts(path: &str, code: &str) -> crate::extract::FileFacts {
        let file = SourceFile::new(path, Language::Python, code);
        let tree = parse_source(&file, &PythonAdapter, None).expect("parses");
        extract(&file, &tree, &PythonAdapter)
    }

    #[test]
    fn test_classes_methods_functions() {
        let source = r#"
class Greeter:
    """A greeter class."""

    def greet(self, name):
        return hello(name)

def hello(name):
    return f"Hello, {name}!"
"#;
        let facts = facts("greeter.py", source);
        let kinds: Vec<_> = facts
            .symbols
            .iter()
            .map(|s| (s.kind, s.qualified_name.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (SymbolKind::Module, "greeter"),
                (SymbolKind::Class, "Greeter"),
                (SymbolKind::Method, "Greeter.greet"),
                (SymbolKind::Function, "hello"),
            ]
        );
        assert_eq!(facts.symbols[2].owner, Some(1));
        assert_eq!(facts.symbols[3].owner, Some(0));
    }

    #[test]
    fn test_bases_and_params() {
        let source = "class Admin(User, mixins.Audit, metaclass=Meta):\n    def grant(self, role: str, *scopes, notify=True, **extra):\n        pass\n";
        let facts = facts("admin.py", source);
        assert_eq!(facts.symbols[1].bases, vec!["User", "mixins.Audit"]);
        assert!(facts.symbols[1].params.is_empty());
        assert_eq!(facts.symbols[2].params, vec!["self", "role", "*scopes", "notify", "**extra"]);
        assert!(facts.symbols[2].bases.is_empty());
    }

    #[test]
    fn test_import_forms() {
        let source = "import os.path\nimport numpy as np\nfrom .util import helper as h, other\nfrom pkg import *\n";
        let facts = facts("pkg/mod.py", source);
        let modules: Vec<_> = facts.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["os.path", "numpy", ".util", "pkg"]);

        assert_eq!(facts.imports[1].bindings, vec![Binding::module("np")]);
        assert_eq!(
            facts.imports[2].bindings,
            vec![Binding::member("h", "helper"), Binding::member("other", "other")]
        );
        assert_eq!(facts.imports[3].bindings, vec![Binding::wildcard()]);
        assert_eq!(facts.imports[2].line, 3);
    }

    #[test]
    fn test_call_shapes() {
        let source = "class A:\n    def run(self):\n        self.step()\n        helper()\n        np.array()\n        a.b.c()\n";
        let facts = facts("a.py", source);
        let targets: Vec<_> = facts.calls.iter().map(|c| c.site.target.clone()).collect();
        assert_eq!(
            targets,
            vec![
                CallTarget::SelfMember("step".to_string()),
                CallTarget::Name("helper".to_string()),
                CallTarget::Member { receiver: "np".to_string(), name: "array".to_string() },
                CallTarget::Dynamic,
            ]
        );
    }

    #[test]
    fn test_absolute_candidates() {
        let import = Import::new("import util", "util", 1);
        let candidates = PythonAdapter.module_candidates("pkg/main.py", &import);
        assert_eq!(candidates[0], ModuleCandidate::exact("pkg/util.py"));
        assert_eq!(candidates[1], ModuleCandidate::exact("pkg/util/__init__.py"));
        assert_eq!(candidates[2], ModuleCandidate::exact("util.py"));
        assert!(candidates.contains(&ModuleCandidate::suffix("util.py")));
    }

    #[test]
    fn test_relative_candidates() {
        let import = Import::new("from ..core import run", "..core", 1)
            .with_binding(Binding::member("run", "run"));
        let candidates = PythonAdapter.module_candidates("app/api/views.py", &import);
        assert_eq!(candidates[0], ModuleCandidate::exact("app/core/run.py"));
        assert_eq!(candidates[1], ModuleCandidate::exact("app/core/run/__init__.py"));
        assert_eq!(candidates[2], ModuleCandidate::exact("app/core.py"));

        let too_far = Import::new("from ... import x", "...", 1);
        assert!(PythonAdapter.module_candidates("a.py", &too_far).is_empty());
    }

    #[test]
    fn test_external_package_and_module_name() {
        assert_eq!(PythonAdapter.external_package(&Import::new("", "os.path", 1)), "os");
        assert_eq!(PythonAdapter.external_package(&Import::new("", ".local", 1)), ".local");
        assert_eq!(PythonAdapter.module_name("pkg/__init__.py"), "pkg");
        assert_eq!(PythonAdapter.module_name("pkg/util.py"), "pkg.util");
    }
}
