//! JavaScript language adapter
//!
//! Handles ES module imports, CommonJS `require`, classes, function
//! declarations and functions bound to a name through `const`/`let`/`var`.
//! Only `./` and `../` specifiers can resolve to repository files; bare
//! specifiers always name packages.

use crate::language::Language;
use crate::scope::{Binding, CallSite, CallTarget, Import};
use crate::source::parent_dir;
use super::framework::{
    join_relative, node_text, start_line, unquote, Definition, LanguageAdapter,
    ModuleCandidate, NodeRole,
};
use tree_sitter::Node;

const EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];

/// JavaScript language adapter
pub struct JavaScriptAdapter;

impl JavaScriptAdapter {
    /// `import a, { b as c } from "./m"`, `import * as ns from "m"`
    fn extract_import(node: Node, source: &[u8]) -> Option<Import> {
        let specifier = node.child_by_field_name("source")?;
        let mut import = Import::new(
            node_text(node, source),
            unquote(node_text(specifier, source)),
            start_line(node),
        );

        let mut cursor = node.walk();
        let clause = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "import_clause");
        let Some(clause) = clause else {
            return Some(import);
        };

        let mut cursor = clause.walk();
        for part in clause.named_children(&mut cursor) {
            match part.kind() {
                // Default imports bind the target's export under the local name;
                // the export is looked up by that same name.
                "identifier" => {
                    let local = node_text(part, source);
                    import = import.with_binding(Binding::member(local, local));
                }
                "namespace_import" => {
                    let mut inner = part.walk();
                    let ident = part
                        .named_children(&mut inner)
                        .find(|c| c.kind() == "identifier");
                    if let Some(ident) = ident {
                        import = import.with_binding(Binding::module(node_text(ident, source)));
                    }
                }
                "named_imports" => {
                    let mut inner = part.walk();
                    for spec in part.named_children(&mut inner) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name) = spec.child_by_field_name("name") else { continue };
                        let name = node_text(name, source);
                        let local = spec
                            .child_by_field_name("alias")
                            .map(|a| node_text(a, source))
                            .unwrap_or(name);
                        import = import.with_binding(Binding::member(local, name));
                    }
                }
                _ => {}
            }
        }
        Some(import)
    }

    /// `export { a } from "./m"` re-exports still depend on the module
    fn extract_reexport(node: Node, source: &[u8]) -> Option<Import> {
        let specifier = node.child_by_field_name("source")?;
        Some(Import::new(
            node_text(node, source),
            unquote(node_text(specifier, source)),
            start_line(node),
        ))
    }

    /// `const x = require("./m")`, `const { a, b } = require("m")`
    fn extract_require(node: Node, source: &[u8]) -> Option<Import> {
        let function = node.child_by_field_name("function")?;
        if function.kind() != "identifier" || node_text(function, source) != "require" {
            return None;
        }
        let arguments = node.child_by_field_name("arguments")?;
        let specifier = arguments.named_child(0)?;
        if specifier.kind() != "string" {
            return None;
        }

        let mut import = Import::new(
            node_text(node, source),
            unquote(node_text(specifier, source)),
            start_line(node),
        );

        let declarator = node.parent().filter(|p| p.kind() == "variable_declarator");
        if let Some(name) = declarator.and_then(|d| d.child_by_field_name("name")) {
            match name.kind() {
                "identifier" => {
                    import = import.with_binding(Binding::module(node_text(name, source)));
                }
                "object_pattern" => {
                    let mut cursor = name.walk();
                    for prop in name.named_children(&mut cursor) {
                        if prop.kind() == "shorthand_property_identifier_pattern" {
                            let member = node_text(prop, source);
                            import = import.with_binding(Binding::member(member, member));
                        }
                    }
                }
                _ => {}
            }
        }
        Some(import)
    }

    fn extract_call(node: Node, source: &[u8]) -> Option<CallSite> {
        let function = node.child_by_field_name("function")?;
        let text = node_text(function, source);

        let target = match function.kind() {
            "identifier" => CallTarget::Name(text.to_string()),
            "member_expression" => {
                let object = function.child_by_field_name("object")?;
                let property = function.child_by_field_name("property")?;
                if matches!(object.kind(), "identifier" | "this") {
                    CallTarget::Member {
                        receiver: node_text(object, source).to_string(),
                        name: node_text(property, source).to_string(),
                    }
                } else {
                    CallTarget::Dynamic
                }
            }
            _ => CallTarget::Dynamic,
        };
        Some(CallSite::new(target, text, start_line(node)))
    }

    /// `const f = () => {}` / `const f = function () {}`
    fn bound_function<'t>(node: Node<'t>, source: &[u8]) -> Option<Definition<'t>> {
        let name = node.child_by_field_name("name")?;
        let value = node.child_by_field_name("value")?;
        if name.kind() != "identifier"
            || !matches!(value.kind(), "arrow_function" | "function_expression" | "function")
        {
            return None;
        }
        Some(
            Definition::callable(node_text(name, source), node, value.child_by_field_name("body"))
                .with_params(Self::parameters(value, source)),
        )
    }

    /// `class A extends mixin(B)` → `[mixin(B)]`
    fn heritage(node: Node, source: &[u8]) -> Vec<String> {
        let mut cursor = node.walk();
        let heritage = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "class_heritage");
        heritage
            .and_then(|h| h.named_child(0))
            .map(|base| vec![node_text(base, source).to_string()])
            .unwrap_or_default()
    }

    /// `(a, b = 1, ...rest)` → `[a, b, ...rest]`; destructured parameters
    /// keep their pattern text. A bare arrow parameter `x => x` counts too.
    fn parameters(node: Node, source: &[u8]) -> Vec<String> {
        if let Some(single) = node.child_by_field_name("parameter") {
            return vec![node_text(single, source).to_string()];
        }
        let Some(list) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut cursor = list.walk();
        list.named_children(&mut cursor)
            .filter(|p| p.kind() != "comment")
            .filter_map(|p| match p.kind() {
                "assignment_pattern" => p.child_by_field_name("left"),
                _ => Some(p),
            })
            .map(|p| node_text(p, source).to_string())
            .collect()
    }
}

impl LanguageAdapter for JavaScriptAdapter {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn classify<'t>(&self, node: Node<'t>, source: &[u8]) -> NodeRole<'t> {
        let named = |node: Node<'t>| {
            node.child_by_field_name("name")
                .map(|n| node_text(n, source).to_string())
        };

        match node.kind() {
            "class_declaration" => match named(node) {
                Some(name) => NodeRole::Definition(
                    Definition::class(name, node, node.child_by_field_name("body"))
                        .with_bases(Self::heritage(node, source)),
                ),
                None => NodeRole::Other,
            },
            "function_declaration" | "generator_function_declaration" | "method_definition" => {
                match named(node) {
                    Some(name) => NodeRole::Definition(
                        Definition::callable(name, node, node.child_by_field_name("body"))
                            .with_params(Self::parameters(node, source)),
                    ),
                    None => NodeRole::Other,
                }
            }
            "variable_declarator" => Self::bound_function(node, source)
                .map(NodeRole::Definition)
                .unwrap_or(NodeRole::Other),
            "import_statement" => {
                NodeRole::Imports(Self::extract_import(node, source).into_iter().collect())
            }
            "export_statement" => match Self::extract_reexport(node, source) {
                Some(import) => NodeRole::Imports(vec![import]),
                None => NodeRole::Other,
            },
            "call_expression" => {
                if let Some(import) = Self::extract_require(node, source) {
                    return NodeRole::Imports(vec![import]);
                }
                Self::extract_call(node, source)
                    .map(NodeRole::Call)
                    .unwrap_or(NodeRole::Other)
            }
            _ => NodeRole::Other,
        }
    }

    fn self_receivers(&self) -> &[&str] {
        &["this"]
    }

    fn module_candidates(&self, importer: &str, import: &Import) -> Vec<ModuleCandidate> {
        if !import.module.starts_with('.') {
            return Vec::new();
        }
        let Some(base) = join_relative(parent_dir(importer), &import.module) else {
            return Vec::new();
        };

        let has_known_ext = base
            .rsplit_once('.')
            .is_some_and(|(_, ext)| EXTENSIONS.contains(&ext));
        if has_known_ext {
            return vec![ModuleCandidate::exact(base)];
        }

        let mut candidates: Vec<ModuleCandidate> = EXTENSIONS
            .iter()
            .map(|ext| ModuleCandidate::exact(format!("{}.{}", base, ext)))
            .collect();
        candidates.push(ModuleCandidate::exact(format!("{}/index.js", base)));
        candidates
    }

    fn external_package(&self, import: &Import) -> String {
        let mut segments = import.module.split('/');
        let first = segments.next().unwrap_or_default();
        match (first.starts_with('@'), segments.next()) {
            (true, Some(name)) => format!("{}/{}", first, name),
            _ => first.to_string(),
        }
    }
}
