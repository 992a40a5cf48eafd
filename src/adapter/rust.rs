//! Rust language adapter
//!
//! `use` trees are expanded into one import per leaf path. `mod name;`
//! declarations are imports of the module file they pull in. Methods declared
//! in `impl` blocks belong to the named type when it is defined in the same
//! file.

use crate::language::Language;
use crate::scope::{Binding, CallSite, CallTarget, Import};
use crate::source::parent_dir;
use super::framework::{
    join_path, join_relative, node_text, start_line, Definition, LanguageAdapter,
    ModuleCandidate, NodeRole,
};
use tree_sitter::Node;

/// Rust language adapter
pub struct RustAdapter;

/// One leaf of an expanded `use` tree
#[derive(Debug, PartialEq)]
struct UseLeaf {
    path: Vec<String>,
    alias: Option<String>,
}

impl RustAdapter {
    fn extract_use(node: Node, source: &[u8]) -> Vec<Import> {
        let Some(argument) = node.child_by_field_name("argument") else {
            return Vec::new();
        };
        let raw = node_text(node, source);
        let line = start_line(node);
        let depth = inline_module_depth(node);

        let mut leaves = Vec::new();
        expand_use_tree(&[], &compact(node_text(argument, source)), &mut leaves);

        leaves
            .into_iter()
            .filter_map(|leaf| {
                let last = leaf.path.last()?.clone();
                let mut path = leaf.path;
                let binding = match last.as_str() {
                    "*" => {
                        path.pop();
                        Binding::wildcard()
                    }
                    "self" => {
                        path.pop();
                        let name = leaf.alias.or_else(|| path.last().cloned())?;
                        Binding::module(name)
                    }
                    _ => Binding::member(leaf.alias.unwrap_or_else(|| last.clone()), last),
                };
                let module = lift_out_of_inline_modules(path, depth).join("::");
                (!module.is_empty()).then(|| Import::new(raw, module, line).with_binding(binding))
            })
            .collect()
    }

    /// `mod name;` pulls in `name.rs` or `name/mod.rs`
    fn extract_mod(node: Node, source: &[u8]) -> Option<Import> {
        if node.child_by_field_name("body").is_some() {
            return None;
        }
        let name = node_text(node.child_by_field_name("name")?, source);
        Some(
            Import::new(node_text(node, source), format!("self::{}", name), start_line(node))
                .with_binding(Binding::module(name)),
        )
    }

    fn extract_call(node: Node, source: &[u8]) -> Option<CallSite> {
        let mut function = node.child_by_field_name("function")?;
        if function.kind() == "generic_function" {
            function = function.child_by_field_name("function")?;
        }
        let text = node_text(function, source);

        let target = match function.kind() {
            "identifier" => CallTarget::Name(text.to_string()),
            "field_expression" => {
                let value = function.child_by_field_name("value")?;
                let field = function.child_by_field_name("field")?;
                if matches!(value.kind(), "identifier" | "self") {
                    CallTarget::Member {
                        receiver: node_text(value, source).to_string(),
                        name: node_text(field, source).to_string(),
                    }
                } else {
                    CallTarget::Dynamic
                }
            }
            "scoped_identifier" => {
                let path = function.child_by_field_name("path");
                let name = function.child_by_field_name("name")?;
                match path {
                    Some(path)
                        if matches!(
                            path.kind(),
                            "identifier" | "type_identifier" | "self" | "super" | "crate"
                        ) =>
                    {
                        CallTarget::Member {
                            receiver: node_text(path, source).to_string(),
                            name: node_text(name, source).to_string(),
                        }
                    }
                    _ => CallTarget::Dynamic,
                }
            }
            _ => CallTarget::Dynamic,
        };
        Some(CallSite::new(target, text, start_line(node)))
    }

    /// `(&mut self, a: u8, (x, y): (i32, i32))` → `[self, a, (x, y)]`
    fn parameters(node: Node, source: &[u8]) -> Vec<String> {
        let Some(list) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut cursor = list.walk();
        list.named_children(&mut cursor)
            .filter_map(|param| match param.kind() {
                "self_parameter" => Some("self".to_string()),
                "parameter" => param
                    .child_by_field_name("pattern")
                    .map(|p| node_text(p, source).to_string()),
                "variadic_parameter" => Some("...".to_string()),
                _ => None,
            })
            .collect()
    }

    /// `trait Shape: Debug + Clone` → `[Debug, Clone]`
    fn supertraits(node: Node, source: &[u8]) -> Vec<String> {
        let Some(bounds) = node.child_by_field_name("bounds") else {
            return Vec::new();
        };
        let mut cursor = bounds.walk();
        bounds
            .named_children(&mut cursor)
            .map(|b| node_text(b, source).to_string())
            .collect()
    }

    /// Crate root directory: everything up to and including the first `src`
    fn crate_root(importer: &str) -> &str {
        if importer.starts_with("src/") {
            return "src";
        }
        match importer.find("/src/") {
            Some(idx) => &importer[..idx + 4],
            None => "",
        }
    }

    /// Directory holding the children of the importer's module
    fn module_dir(importer: &str) -> String {
        let dir = parent_dir(importer);
        let file = importer.rsplit('/').next().unwrap_or(importer);
        let stem = file.strip_suffix(".rs").unwrap_or(file);
        match stem {
            "mod" | "lib" | "main" => dir.to_string(),
            _ => join_path(&[dir, stem]),
        }
    }
}

impl LanguageAdapter for RustAdapter {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_rust::LANGUAGE.into()
    }

    fn classify<'t>(&self, node: Node<'t>, source: &[u8]) -> NodeRole<'t> {
        let name = || {
            node.child_by_field_name("name")
                .map(|n| node_text(n, source).to_string())
        };

        match node.kind() {
            "function_item" | "function_signature_item" => match name() {
                Some(name) => NodeRole::Definition(
                    Definition::callable(name, node, node.child_by_field_name("body"))
                        .with_params(Self::parameters(node, source)),
                ),
                None => NodeRole::Other,
            },
            "struct_item" | "enum_item" | "union_item" => match name() {
                Some(name) => NodeRole::Definition(Definition::class(name, node, None)),
                None => NodeRole::Other,
            },
            "trait_item" => match name() {
                Some(name) => NodeRole::Definition(
                    Definition::class(name, node, node.child_by_field_name("body"))
                        .with_bases(Self::supertraits(node, source)),
                ),
                None => NodeRole::Other,
            },
            "impl_item" => {
                let type_name = node
                    .child_by_field_name("type")
                    .map(|t| base_type_name(node_text(t, source)))
                    .unwrap_or_default();
                match node.child_by_field_name("body") {
                    Some(body) if !type_name.is_empty() => NodeRole::TypeScope { type_name, body },
                    _ => NodeRole::Other,
                }
            }
            "use_declaration" => NodeRole::Imports(Self::extract_use(node, source)),
            "mod_item" => match Self::extract_mod(node, source) {
                Some(import) => NodeRole::Imports(vec![import]),
                None => NodeRole::Other,
            },
            "call_expression" => Self::extract_call(node, source)
                .map(NodeRole::Call)
                .unwrap_or(NodeRole::Other),
            _ => NodeRole::Other,
        }
    }

    fn self_receivers(&self) -> &[&str] {
        &["self", "Self"]
    }

    fn module_candidates(&self, importer: &str, import: &Import) -> Vec<ModuleCandidate> {
        let segments: Vec<&str> = import.module.split("::").collect();
        let module_dir = Self::module_dir(importer);

        let (base, rest) = match segments.first().copied() {
            Some("crate") => (Self::crate_root(importer).to_string(), &segments[1..]),
            Some("self") => (module_dir, &segments[1..]),
            Some("super") => {
                let supers = segments.iter().take_while(|s| **s == "super").count();
                match join_relative(&module_dir, &"../".repeat(supers)) {
                    Some(base) => (base, &segments[supers..]),
                    None => return Vec::new(),
                }
            }
            _ => (module_dir, &segments[..]),
        };

        if rest.is_empty() {
            let base = base.as_str();
            return vec![
                ModuleCandidate::exact(format!("{}.rs", base)),
                ModuleCandidate::exact(join_path(&[base, "mod.rs"])),
                ModuleCandidate::exact(join_path(&[base, "lib.rs"])),
                ModuleCandidate::exact(join_path(&[base, "main.rs"])),
            ];
        }

        (1..=rest.len())
            .rev()
            .flat_map(|k| {
                let tail = rest[..k].join("/");
                let module = join_path(&[base.as_str(), tail.as_str()]);
                [
                    ModuleCandidate::exact(format!("{}.rs", module)),
                    ModuleCandidate::exact(join_path(&[module.as_str(), "mod.rs"])),
                ]
            })
            .collect()
    }

    fn external_package(&self, import: &Import) -> String {
        match import.module.split("::").next() {
            Some("crate" | "self" | "super") | None => import.module.clone(),
            Some(first) => first.to_string(),
        }
    }
}

/// Collapse whitespace so `use` trees spanning lines can be split textually
fn compact(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.join(" ")
}

/// Split on commas that are not nested inside braces
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts.into_iter().map(str::trim).filter(|p| !p.is_empty()).collect()
}

fn expand_use_tree(prefix: &[String], tree: &str, leaves: &mut Vec<UseLeaf>) {
    let tree = tree.trim().trim_start_matches("::");

    if let (Some(open), true) = (tree.find('{'), tree.ends_with('}')) {
        let head = tree[..open].trim().trim_end_matches("::");
        let mut path = prefix.to_vec();
        path.extend(head.split("::").map(str::trim).filter(|s| !s.is_empty()).map(String::from));
        for part in split_top_level(&tree[open + 1..tree.len() - 1]) {
            expand_use_tree(&path, part, leaves);
        }
        return;
    }

    let (path_text, alias) = match tree.split_once(" as ") {
        Some((path, alias)) => (path, Some(alias.trim().to_string())),
        None => (tree, None),
    };
    let mut path = prefix.to_vec();
    path.extend(
        path_text
            .split("::")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    );
    // `use a::b as _;` binds nothing usable
    let alias = alias.filter(|a| a != "_");
    if !path.is_empty() {
        leaves.push(UseLeaf { path, alias });
    }
}

/// Number of inline `mod name { ... }` blocks enclosing a node
fn inline_module_depth(node: Node) -> usize {
    let mut depth = 0;
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.kind() == "mod_item" {
            depth += 1;
        }
        current = parent.parent();
    }
    depth
}

/// Inline modules share their file, so `super` out of one stays in the file
fn lift_out_of_inline_modules(mut path: Vec<String>, depth: usize) -> Vec<String> {
    let supers = path.iter().take_while(|s| *s == "super").count();
    let lifted = supers.min(depth);
    if lifted == 0 {
        return path;
    }
    path.drain(..lifted);
    if lifted == supers {
        path.insert(0, "self".to_string());
    }
    path
}

/// `Wrapper<T>` → `Wrapper`, `crate::a::Point` → `Point`, `&mut Self` → `Self`
fn base_type_name(text: &str) -> String {
    let text = text.split('<').next().unwrap_or(text);
    let text = text.rsplit("::").next().unwrap_or(text);
    text.trim_start_matches(['&', '*'])
        .trim_start_matches("mut ")
        .trim_start_matches("dyn ")
        .trim()
        .to_string()
}
