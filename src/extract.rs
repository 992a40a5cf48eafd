//! Entity extraction
//!
//! One generic walk over a syntax tree, driven by the adapter's node
//! classification. Produces the file's symbols in source order, its imports
//! and the call sites of each callable. Nothing here looks at other files;
//! resolution happens in the linker once every file has been extracted.

use crate::adapter::{Definition, DefinitionKind, LanguageAdapter, NodeRole};
use crate::parser::SyntaxTree;
use crate::scope::{CallSite, CallTarget, Import};
use crate::source::SourceFile;
use crate::symbol::SymbolKind;
use crate::adapter::framework::{end_line, start_line};
use tree_sitter::Node;

/// A symbol before it has a repository-wide identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSymbol {
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: String,
    pub line_start: u32,
    pub line_end: u32,
    /// 1-indexed start column; tells apart definitions sharing a line
    pub column: u32,
    /// Index of the owning symbol within the same file; `None` for the module
    pub owner: Option<usize>,
    pub bases: Vec<String>,
    pub params: Vec<String>,
}

/// A call site attributed to the callable it appears in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCall {
    /// Index of the calling symbol within the same file
    pub caller: usize,
    pub site: CallSite,
}

/// Everything extracted from one file.
#[derive(Debug, Clone, Default)]
pub struct FileFacts {
    /// Module symbol first, then definitions in source order
    pub symbols: Vec<ExtractedSymbol>,
    pub imports: Vec<Import>,
    pub calls: Vec<RawCall>,
    /// Calls at module level; they have no callable to attach to
    pub module_level_calls: usize,
}

/// A source file together with its extracted facts.
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    pub file: SourceFile,
    pub facts: FileFacts,
}

impl FileFacts {
    /// Direct children of the module that other files can refer to by name
    pub fn top_level(&self, name: &str) -> Option<usize> {
        self.children(0, name, |kind| matches!(kind, SymbolKind::Class | SymbolKind::Function))
    }

    /// Last symbol owned by `owner` with the given name and an accepted kind
    pub fn children(
        &self,
        owner: usize,
        name: &str,
        accept: impl Fn(SymbolKind) -> bool,
    ) -> Option<usize> {
        self.symbols
            .iter()
            .rposition(|s| s.owner == Some(owner) && s.name == name && accept(s.kind))
    }
}

enum Scope {
    Class(usize),
    Callable { index: usize, is_method: bool, receiver: Option<String> },
    /// Rust `impl T { ... }`
    Type(String),
}

struct Walker<'a> {
    adapter: &'a dyn LanguageAdapter,
    source: &'a [u8],
    facts: FileFacts,
    scopes: Vec<Scope>,
    /// Symbols whose owner is a type named elsewhere in the file
    pending_owners: Vec<(usize, String)>,
}

/// Extract symbols, imports and call sites from a parsed file
pub fn extract(file: &SourceFile, tree: &SyntaxTree, adapter: &dyn LanguageAdapter) -> FileFacts {
    let qualified_name = adapter.module_name(&file.path);
    let name = qualified_name
        .rsplit('.')
        .next()
        .unwrap_or(&qualified_name)
        .to_string();

    let mut walker = Walker {
        adapter,
        source: file.text.as_bytes(),
        facts: FileFacts::default(),
        scopes: Vec::new(),
        pending_owners: Vec::new(),
    };
    walker.facts.symbols.push(ExtractedSymbol {
        kind: SymbolKind::Module,
        name,
        qualified_name,
        line_start: 1,
        line_end: file.line_count.max(1),
        column: 1,
        owner: None,
        bases: Vec::new(),
        params: Vec::new(),
    });

    walker.walk(tree.root());
    walker.resolve_pending_owners();

    if walker.facts.module_level_calls > 0 {
        tracing::debug!(
            "{}: {} module-level calls produce no call edges",
            file.path,
            walker.facts.module_level_calls
        );
    }
    walker.facts
}

/// Work left on the walk stack
enum Step<'t> {
    Visit(Node<'t>),
    /// Leave the scope entered by a definition body or a type block
    Exit,
}

/// Queue a node's named children so they pop in source order
fn push_children<'t>(stack: &mut Vec<Step<'t>>, node: Node<'t>) {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    stack.extend(children.into_iter().rev().map(Step::Visit));
}

impl<'a> Walker<'a> {
    /// Preorder walk with an explicit stack; tree depth never grows the
    /// thread's call stack.
    fn walk<'t>(&mut self, root: Node<'t>) {
        let mut stack = vec![Step::Visit(root)];
        while let Some(step) = stack.pop() {
            let node = match step {
                Step::Visit(node) => node,
                Step::Exit => {
                    self.scopes.pop();
                    continue;
                }
            };
            match self.adapter.classify(node, self.source) {
                NodeRole::Definition(definition) => {
                    if let Some((scope, body)) = self.define(definition) {
                        self.scopes.push(scope);
                        stack.push(Step::Exit);
                        stack.push(Step::Visit(body));
                    }
                }
                NodeRole::TypeScope { type_name, body } => {
                    self.scopes.push(Scope::Type(type_name));
                    stack.push(Step::Exit);
                    push_children(&mut stack, body);
                }
                NodeRole::Imports(imports) => self.facts.imports.extend(imports),
                NodeRole::Call(site) => {
                    self.record_call(site);
                    push_children(&mut stack, node);
                }
                NodeRole::Other => push_children(&mut stack, node),
            }
        }
    }

    /// Record a definition. Returns the scope its body opens, if it has one.
    fn define<'t>(&mut self, definition: Definition<'t>) -> Option<(Scope, Node<'t>)> {
        let index = self.facts.symbols.len();

        // Owner and name prefix come from the innermost enclosing scope
        let (owner, prefix, type_owner) = match (&definition.attach_to, self.scopes.last()) {
            (Some(type_name), _) | (None, Some(Scope::Type(type_name))) => {
                (0, Some(type_name.clone()), Some(type_name.clone()))
            }
            (None, Some(Scope::Class(i))) | (None, Some(Scope::Callable { index: i, .. })) => {
                (*i, Some(self.facts.symbols[*i].qualified_name.clone()), None)
            }
            (None, None) => (0, None, None),
        };

        let kind = match definition.kind {
            DefinitionKind::Class => SymbolKind::Class,
            DefinitionKind::Callable => {
                let in_type =
                    type_owner.is_some() || matches!(self.scopes.last(), Some(Scope::Class(_)));
                if in_type { SymbolKind::Method } else { SymbolKind::Function }
            }
        };

        let qualified_name = match prefix {
            Some(prefix) => format!("{}.{}", prefix, definition.name),
            None => definition.name.clone(),
        };

        self.facts.symbols.push(ExtractedSymbol {
            kind,
            name: definition.name,
            qualified_name,
            line_start: start_line(definition.node),
            line_end: end_line(definition.node),
            column: definition.node.start_position().column as u32 + 1,
            owner: Some(owner),
            bases: definition.bases,
            params: definition.params,
        });
        if let Some(type_name) = type_owner {
            self.pending_owners.push((index, type_name));
        }

        let body = definition.body?;
        let scope = match kind {
            SymbolKind::Class => Scope::Class(index),
            _ => Scope::Callable {
                index,
                is_method: kind == SymbolKind::Method,
                receiver: definition.receiver,
            },
        };
        Some((scope, body))
    }

    fn record_call(&mut self, mut site: CallSite) {
        let caller = self.scopes.iter().rev().find_map(|scope| match scope {
            Scope::Callable { index, is_method, receiver } => {
                Some((*index, *is_method, receiver.as_deref()))
            }
            _ => None,
        });
        let Some((caller, is_method, receiver)) = caller else {
            self.facts.module_level_calls += 1;
            return;
        };

        if is_method {
            if let CallTarget::Member { receiver: object, name } = &site.target {
                let is_self = receiver == Some(object.as_str())
                    || self.adapter.self_receivers().contains(&object.as_str());
                if is_self {
                    site.target = CallTarget::SelfMember(name.clone());
                }
            }
        }
        self.facts.calls.push(RawCall { caller, site });
    }

    /// Attach methods declared outside their type to a same-file type of that
    /// name. The last such type wins, matching how redefinitions resolve.
    fn resolve_pending_owners(&mut self) {
        for (index, type_name) in std::mem::take(&mut self.pending_owners) {
            let class = self
                .facts
                .symbols
                .iter()
                .rposition(|s| s.kind == SymbolKind::Class && s.name == type_name);
            if let Some(class) = class {
                self.facts.symbols[index].owner = Some(class);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::PythonAdapter;
    use crate::language::Language;
    use crate::parser::parse_source;

    fn facts(code: &str) -> FileFacts {
        let file = SourceFile::new("pkg/app.py", Language::Python, code);
        let tree = parse_source(&file, &PythonAdapter, None).unwrap();
        extract(&file, &tree, &PythonAdapter)
    }

    #[test]
    fn test_module_symbol_spans_file() {
        let facts = facts("x = 1\ny = 2\n\ndef f():\n    pass\n");
        let module = &facts.symbols[0];
        assert_eq!(module.kind, SymbolKind::Module);
        assert_eq!(module.qualified_name, "pkg.app");
        assert_eq!(module.name, "app");
        assert_eq!((module.line_start, module.line_end), (1, 5));
        assert_eq!(module.owner, None);
    }

    #[test]
    fn test_nested_functions_are_owned_by_their_parent() {
        let facts = facts("def outer():\n    def inner():\n        return 1\n    return inner()\n");
        assert_eq!(facts.symbols[1].qualified_name, "outer");
        assert_eq!(facts.symbols[2].qualified_name, "outer.inner");
        assert_eq!(facts.symbols[2].kind, SymbolKind::Function);
        assert_eq!(facts.symbols[2].owner, Some(1));
        assert_eq!(facts.calls.len(), 1);
        assert_eq!(facts.calls[0].caller, 1);
        assert_eq!((facts.symbols[2].line_start, facts.symbols[2].line_end), (2, 3));
    }

    #[test]
    fn test_module_level_calls_have_no_caller() {
        let facts = facts("setup()\n\ndef main():\n    run()\n\nmain()\n");
        assert_eq!(facts.module_level_calls, 2);
        assert_eq!(facts.calls.len(), 1);
        assert_eq!(facts.calls[0].site.text, "run");
        assert_eq!(facts.calls[0].site.line, 4);
    }

    #[test]
    fn test_nested_call_arguments_are_walked() {
        let facts = facts("def f():\n    outer(inner(1))\n");
        let texts: Vec<_> = facts.calls.iter().map(|c| c.site.text.as_str()).collect();
        assert_eq!(texts, vec!["outer", "inner"]);
    }

    #[test]
    fn test_deeply_nested_expression_is_walked() {
        let mut code = String::from("def f():\n    return g(1");
        code.push_str(&" + 1".repeat(50_000));
        code.push_str(")\n");
        let facts = facts(&code);
        assert_eq!(facts.symbols.len(), 2);
        assert_eq!(facts.calls.len(), 1);
        assert_eq!(facts.calls[0].site.text, "g");
    }

    #[test]
    fn test_self_call_outside_method_stays_member() {
        let facts = facts("def f(self):\n    self.go()\n");
        assert_eq!(
            facts.calls[0].site.target,
            CallTarget::Member { receiver: "self".to_string(), name: "go".to_string() }
        );
    }
}
