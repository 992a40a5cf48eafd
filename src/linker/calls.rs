//! Call resolution
//!
//! Resolution algorithm:
//! 1. Walk outward from the caller through its enclosing symbols
//! 2. Follow the file's import bindings, then its wildcard imports
//! 3. Anything else stays unresolved with the callee text as written
//!
//! Only the caller's file and files its internal imports point at are ever
//! searched. A name that only exists in some unrelated file stays unresolved.

use super::imports::{BindingTable, BoundName};
use super::{LinkedCall, Linker};
use crate::extract::RawCall;
use crate::scope::CallTarget;
use crate::symbol::SymbolKind;

/// Where a call site points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallResolution {
    /// A symbol by (file index, symbol index within that file)
    Symbol { file: usize, symbol: usize },
    /// Callee text, whitespace-compacted
    Unresolved(String),
}

fn nameable(kind: SymbolKind) -> bool {
    matches!(kind, SymbolKind::Class | SymbolKind::Function)
}

fn is_method(kind: SymbolKind) -> bool {
    kind == SymbolKind::Method
}

impl<'a> Linker<'a> {
    pub(super) fn resolve_calls(&self, index: usize, bindings: &BindingTable) -> Vec<LinkedCall> {
        self.files[index]
            .facts
            .calls
            .iter()
            .map(|call| {
                let callee = self
                    .resolve_call(index, bindings, call)
                    .map(|(file, symbol)| CallResolution::Symbol { file, symbol })
                    .unwrap_or_else(|| CallResolution::Unresolved(compact(&call.site.text)));
                LinkedCall { caller: call.caller, callee, line: call.site.line }
            })
            .collect()
    }

    fn resolve_call(
        &self,
        index: usize,
        bindings: &BindingTable,
        call: &RawCall,
    ) -> Option<(usize, usize)> {
        let facts = &self.files[index].facts;

        match &call.site.target {
            CallTarget::Name(name) => self
                .lexical(index, call.caller, name)
                .map(|symbol| (index, symbol))
                .or_else(|| match bindings.get(name)? {
                    BoundName::Member { file, member } => self.module_member(*file, member),
                    BoundName::Module(_) => None,
                })
                .or_else(|| {
                    bindings
                        .wildcards()
                        .iter()
                        .rev()
                        .find_map(|&file| self.module_member(file, name))
                }),

            CallTarget::SelfMember(name) => self.self_member(index, call.caller, name),

            CallTarget::Member { receiver, name } => {
                if let Some(class) = self
                    .lexical(index, call.caller, receiver)
                    .filter(|&s| facts.symbols[s].kind == SymbolKind::Class)
                {
                    return facts.children(class, name, is_method).map(|m| (index, m));
                }
                match bindings.get(receiver)? {
                    BoundName::Module(file) => self.module_member(*file, name),
                    BoundName::Member { file, member } => {
                        let (class_file, class) = self.module_member(*file, member)?;
                        let class_facts = &self.files[class_file].facts;
                        if class_facts.symbols[class].kind != SymbolKind::Class {
                            return None;
                        }
                        class_facts.children(class, name, is_method).map(|m| (class_file, m))
                    }
                }
            }

            CallTarget::Dynamic => None,
        }
    }

    /// Class or function visible by bare name from `caller`, innermost first
    fn lexical(&self, index: usize, caller: usize, name: &str) -> Option<usize> {
        let facts = &self.files[index].facts;
        let mut scope = Some(caller);
        while let Some(current) = scope {
            if let Some(hit) = facts.children(current, name, nameable) {
                return Some(hit);
            }
            scope = facts.symbols[current].owner;
        }
        None
    }

    /// Top-level class or function of an imported module
    fn module_member(&self, file: usize, name: &str) -> Option<(usize, usize)> {
        self.files[file].facts.top_level(name).map(|symbol| (file, symbol))
    }

    /// `self.m()`: a method of the caller's enclosing class, or of the type a
    /// detached method is declared on (Rust `impl`, Go receivers)
    fn self_member(&self, index: usize, caller: usize, name: &str) -> Option<(usize, usize)> {
        let facts = &self.files[index].facts;
        let mut scope = Some(caller);
        while let Some(current) = scope {
            if facts.symbols[current].kind == SymbolKind::Class {
                if let Some(method) = facts.children(current, name, is_method) {
                    return Some((index, method));
                }
                break;
            }
            scope = facts.symbols[current].owner;
        }

        let caller_symbol = &facts.symbols[caller];
        if caller_symbol.kind != SymbolKind::Method {
            return None;
        }
        let (type_name, _) = caller_symbol.qualified_name.rsplit_once('.')?;
        let qualified = format!("{}.{}", type_name, name);
        facts
            .symbols
            .iter()
            .rposition(|s| s.kind == SymbolKind::Method && s.qualified_name == qualified)
            .map(|s| (index, s))
    }
}

/// Collapse runs of whitespace to single spaces
fn compact(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
