//! Go language adapter
//!
//! Go imports name packages (directories), not files. When the run contains
//! a `go.mod`, only imports under its declared module path are internal and
//! they resolve to the matching directory below the manifest. Without one, a
//! hosted import path resolves to a directory whose path ends with a suffix
//! of the import path. Standard-library paths are always external.

use crate::language::Language;
use crate::scope::{Binding, CallSite, CallTarget, Import};
use super::framework::{
    join_path, node_text, start_line, unquote, Definition, LanguageAdapter, ModuleCandidate,
    ModuleRoots, NodeRole,
};
use tree_sitter::Node;

/// Go language adapter
pub struct GoAdapter;

impl GoAdapter {
    /// Receiver name and base type of a method: `(s *Server)` → (`s`, `Server`)
    fn receiver(node: Node, source: &[u8]) -> Option<(Option<String>, String)> {
        let list = node.child_by_field_name("receiver")?;
        let mut cursor = list.walk();
        let param = list
            .named_children(&mut cursor)
            .find(|c| c.kind() == "parameter_declaration")?;
        let name = param
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string());
        let type_text = node_text(param.child_by_field_name("type")?, source);
        let type_name = type_text
            .trim_start_matches('*')
            .split('[')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        (!type_name.is_empty()).then_some((name, type_name))
    }

    /// `(a, b int, opts ...Option)` → `[a, b, opts]`
    fn parameters(node: Node, source: &[u8]) -> Vec<String> {
        let Some(list) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut names = Vec::new();
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            let mut inner = param.walk();
            names.extend(
                param
                    .children_by_field_name("name", &mut inner)
                    .map(|n| node_text(n, source).to_string()),
            );
        }
        names
    }

    /// Embedded fields of a struct and embedded interfaces of an interface
    fn embedded(type_node: Node, source: &[u8]) -> Vec<String> {
        let mut cursor = type_node.walk();
        let members: Vec<Node> = match type_node.kind() {
            "struct_type" => type_node
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "field_declaration_list")
                .flat_map(|list| {
                    let mut inner = list.walk();
                    list.named_children(&mut inner).collect::<Vec<_>>()
                })
                .filter(|f| {
                    f.kind() == "field_declaration" && f.child_by_field_name("name").is_none()
                })
                .filter_map(|f| f.child_by_field_name("type"))
                .collect(),
            "interface_type" => type_node
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "type_elem")
                .collect(),
            _ => Vec::new(),
        };
        members
            .into_iter()
            .map(|m| node_text(m, source).trim_start_matches('*').to_string())
            .collect()
    }

    fn extract_import_spec(node: Node, source: &[u8]) -> Option<Import> {
        let path = unquote(node_text(node.child_by_field_name("path")?, source));
        let import = Import::new(node_text(node, source), path, start_line(node));

        let binding = match node.child_by_field_name("name") {
            Some(name) => match node_text(name, source) {
                "." => Some(Binding::wildcard()),
                "_" => None,
                alias => Some(Binding::module(alias)),
            },
            None => Some(Binding::module(package_name(path))),
        };
        Some(match binding {
            Some(binding) => import.with_binding(binding),
            None => import,
        })
    }

    fn extract_call(node: Node, source: &[u8]) -> Option<CallSite> {
        let function = node.child_by_field_name("function")?;
        let text = node_text(function, source);

        let target = match function.kind() {
            "identifier" => CallTarget::Name(text.to_string()),
            "selector_expression" => {
                let operand = function.child_by_field_name("operand")?;
                let field = function.child_by_field_name("field")?;
                if operand.kind() == "identifier" {
                    CallTarget::Member {
                        receiver: node_text(operand, source).to_string(),
                        name: node_text(field, source).to_string(),
                    }
                } else {
                    CallTarget::Dynamic
                }
            }
            _ => CallTarget::Dynamic,
        };
        Some(CallSite::new(target, text, start_line(node)))
    }
}

impl LanguageAdapter for GoAdapter {
    fn language(&self) -> Language {
        Language::Go
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_go::LANGUAGE.into()
    }

    fn classify<'t>(&self, node: Node<'t>, source: &[u8]) -> NodeRole<'t> {
        match node.kind() {
            "function_declaration" => match node.child_by_field_name("name") {
                Some(name) => {
                    let body = node.child_by_field_name("body");
                    NodeRole::Definition(
                        Definition::callable(node_text(name, source), node, body)
                            .with_params(Self::parameters(node, source)),
                    )
                }
                None => NodeRole::Other,
            },
            "method_declaration" => {
                let name = node.child_by_field_name("name");
                match (name, Self::receiver(node, source)) {
                    (Some(name), Some((receiver, type_name))) => {
                        let body = node.child_by_field_name("body");
                        NodeRole::Definition(
                            Definition::callable(node_text(name, source), node, body)
                                .with_receiver(receiver)
                                .attached_to(type_name)
                                .with_params(Self::parameters(node, source)),
                        )
                    }
                    _ => NodeRole::Other,
                }
            }
            "type_spec" => {
                let name = node.child_by_field_name("name");
                let class_type = node
                    .child_by_field_name("type")
                    .filter(|t| matches!(t.kind(), "struct_type" | "interface_type"));
                match (name, class_type) {
                    (Some(name), Some(class_type)) => NodeRole::Definition(
                        Definition::class(node_text(name, source), node, None)
                            .with_bases(Self::embedded(class_type, source)),
                    ),
                    _ => NodeRole::Other,
                }
            }
            "import_spec" => {
                NodeRole::Imports(Self::extract_import_spec(node, source).into_iter().collect())
            }
            "call_expression" => Self::extract_call(node, source)
                .map(NodeRole::Call)
                .unwrap_or(NodeRole::Other),
            _ => NodeRole::Other,
        }
    }

    fn self_receivers(&self) -> &[&str] {
        &[]
    }

    fn module_candidates(&self, _importer: &str, import: &Import) -> Vec<ModuleCandidate> {
        let segments: Vec<&str> = import.module.split('/').filter(|s| !s.is_empty()).collect();
        if is_standard_library(&segments) {
            return Vec::new();
        }

        // Drop the host, then the owner, then the repository name. Suffixes of
        // a single segment are only tried once the repository part is gone.
        let n = segments.len();
        (1..n)
            .filter(|&k| n - k >= 2 || k >= 3)
            .map(|k| ModuleCandidate::suffix_dir(segments[k..].join("/")))
            .collect()
    }

    /// With declared modules, only imports under one of them can be
    /// internal. Nested modules are tried before the modules enclosing them.
    fn module_candidates_in(
        &self,
        importer: &str,
        import: &Import,
        roots: &ModuleRoots,
    ) -> Vec<ModuleCandidate> {
        let mut declared: Vec<_> = roots.for_language(Language::Go).collect();
        if declared.is_empty() {
            return self.module_candidates(importer, import);
        }
        declared.sort_by(|a, b| b.name.len().cmp(&a.name.len()).then_with(|| a.dir.cmp(&b.dir)));
        declared
            .into_iter()
            .filter_map(|root| {
                let rest = if import.module == root.name {
                    ""
                } else {
                    import.module.strip_prefix(root.name.as_str())?.strip_prefix('/')?
                };
                Some(ModuleCandidate::dir(join_path(&[root.dir.as_str(), rest])))
            })
            .collect()
    }

    fn manifest_module(&self, path: &str, text: &str) -> Option<String> {
        let file = path.rsplit('/').next().unwrap_or(path);
        if file != "go.mod" {
            return None;
        }
        module_directive(text)
    }

    fn external_package(&self, import: &Import) -> String {
        let segments: Vec<&str> = import.module.split('/').filter(|s| !s.is_empty()).collect();
        if is_standard_library(&segments) {
            return import.module.clone();
        }
        segments[..segments.len().min(3)].join("/")
    }
}

/// Module path of a `go.mod` `module` directive
fn module_directive(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or(line).trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let name = unquote(rest.trim());
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Standard-library paths have no dot in their first segment
fn is_standard_library(segments: &[&str]) -> bool {
    segments.first().is_none_or(|first| !first.contains('.'))
}

/// Default package name of an import path, skipping major-version suffixes
fn package_name(path: &str) -> &str {
    let mut segments = path.rsplit('/');
    let last = segments.next().unwrap_or(path);
    let is_version = last.len() > 1
        && last.starts_with('v')
        && last[1..].chars().all(|c| c.is_ascii_digit());
    match (is_version, segments.next()) {
        (true, Some(previous)) => previous,
        _ => last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ModuleRoot;
    use crate::extract::extract;
    use crate::parser::parse_source;
    use crate::source::SourceFile;
    use crate::symbol::SymbolKind;

    fn facts(path: &str, code: &str) -> crate::extract::FileFacts {
        let file = SourceFile::new(path, Language::Go, code);
        let tree = parse_source(&file, &GoAdapter, None).expect("parses");
        extract(&file, &tree, &GoAdapter)
    }

    #[test]
    fn test_methods_and_types() {
        let source = r#"package server

import (
    "fmt"
    u "github.com/acme/app/internal/util"
)

type Server struct {
    name string
}

func (s *Server) Start() {
    s.listen()
    fmt.Println(u.Join("a", "b"))
}

func (s *Server) listen() {}

func New() *Server {
    return &Server{}
}
"#;
        let facts = facts("server/server.go", source);
        let names: Vec<_> = facts
            .symbols
            .iter()
            .map(|s| (s.kind, s.qualified_name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                (SymbolKind::Module, "server.server"),
                (SymbolKind::Class, "Server"),
                (SymbolKind::Method, "Server.Start"),
                (SymbolKind::Method, "Server.listen"),
                (SymbolKind::Function, "New"),
            ]
        );
        assert_eq!(facts.symbols[2].owner, Some(1));
        assert_eq!(facts.calls[0].site.target, CallTarget::SelfMember("listen".to_string()));

        assert_eq!(facts.imports.len(), 2);
        assert_eq!(facts.imports[0].bindings, vec![Binding::module("fmt")]);
        assert_eq!(facts.imports[1].bindings, vec![Binding::module("u")]);
    }

    #[test]
    fn test_method_on_type_from_other_file() {
        let facts = facts("server/handlers.go", "package server\n\nfunc (s Server) Handle() {}\n");
        assert_eq!(facts.symbols[1].kind, SymbolKind::Method);
        assert_eq!(facts.symbols[1].qualified_name, "Server.Handle");
        assert_eq!(facts.symbols[1].owner, Some(0));
    }

    #[test]
    fn test_candidates_without_manifest() {
        let std = Import::new("", "encoding/json", 1);
        assert!(GoAdapter.module_candidates("main.go", &std).is_empty());
        assert_eq!(GoAdapter.external_package(&std), "encoding/json");

        let hosted = Import::new("", "github.com/acme/app/internal/util", 1);
        let candidates = GoAdapter.module_candidates("main.go", &hosted);
        assert_eq!(
            candidates,
            vec![
                ModuleCandidate::suffix_dir("acme/app/internal/util"),
                ModuleCandidate::suffix_dir("app/internal/util"),
                ModuleCandidate::suffix_dir("internal/util"),
                ModuleCandidate::suffix_dir("util"),
            ]
        );
        assert_eq!(GoAdapter.external_package(&hosted), "github.com/acme/app");

        let dep = Import::new("", "github.com/pkg/errors", 1);
        assert_eq!(
            GoAdapter.module_candidates("main.go", &dep),
            vec![ModuleCandidate::suffix_dir("pkg/errors")]
        );
    }

    #[test]
    fn test_declared_module_decides_internal() {
        let roots = ModuleRoots::new(vec![ModuleRoot {
            language: Language::Go,
            dir: String::new(),
            name: "github.com/acme/app".to_string(),
        }]);

        let own = Import::new("", "github.com/acme/app/internal/util", 1);
        assert_eq!(
            GoAdapter.module_candidates_in("main.go", &own, &roots),
            vec![ModuleCandidate::dir("internal/util")]
        );

        let dep = Import::new("", "github.com/pkg/errors", 1);
        assert!(GoAdapter.module_candidates_in("main.go", &dep, &roots).is_empty());

        let lookalike = Import::new("", "github.com/acme/application/x", 1);
        assert!(GoAdapter.module_candidates_in("main.go", &lookalike, &roots).is_empty());
    }

    #[test]
    fn test_nested_module_wins() {
        let roots = ModuleRoots::new(vec![
            ModuleRoot {
                language: Language::Go,
                dir: String::new(),
                name: "example.com/app".to_string(),
            },
            ModuleRoot {
                language: Language::Go,
                dir: "hack/tools".to_string(),
                name: "example.com/app/tools".to_string(),
            },
        ]);
        let import = Import::new("", "example.com/app/tools/gen", 1);
        assert_eq!(
            GoAdapter.module_candidates_in("main.go", &import, &roots),
            vec![ModuleCandidate::dir("hack/tools/gen"), ModuleCandidate::dir("tools/gen")]
        );
    }

    #[test]
    fn test_module_directive() {
        let text = "// app\nmodule example.com/app // root\n\ngo 1.22\n";
        assert_eq!(module_directive(text).as_deref(), Some("example.com/app"));
        let quoted = "module \"example.com/quoted\"\n";
        assert_eq!(module_directive(quoted).as_deref(), Some("example.com/quoted"));
        assert_eq!(module_directive("modules x\n"), None);
        assert_eq!(GoAdapter.manifest_module("svc/go.mod", "module svc\n").as_deref(), Some("svc"));
        assert_eq!(GoAdapter.manifest_module("svc/go.sum", "module svc\n"), None);
    }

    #[test]
    fn test_params_and_embedded_types() {
        let source = r#"package shapes

type Base struct{}

type Square struct {
    Base
    *Named
    side int
}

type Shape interface {
    fmt.Stringer
    Area() float64
}

func (s *Square) Scale(x, y float64, opts ...Option) {}
"#;
        let facts = facts("shapes/square.go", source);
        let square = facts.symbols.iter().find(|s| s.name == "Square").unwrap();
        assert_eq!(square.bases, vec!["Base", "Named"]);
        let shape = facts.symbols.iter().find(|s| s.name == "Shape").unwrap();
        assert_eq!(shape.bases, vec!["fmt.Stringer"]);
        let scale = facts.symbols.iter().find(|s| s.name == "Scale").unwrap();
        assert_eq!(scale.params, vec!["x", "y", "opts"]);
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("github.com/acme/app/util"), "util");
        assert_eq!(package_name("github.com/acme/lib/v2"), "lib");
        assert_eq!(package_name("fmt"), "fmt");
    }
}
