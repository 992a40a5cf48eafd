//! Symbol types
//!
//! Every language is mapped onto four symbol kinds:
//! - `Module`: the implicit root symbol of each file
//! - `Class`: class, struct, enum, trait, interface, named type
//! - `Function`: a callable owned by a module or another callable
//! - `Method`: a callable owned by a class

use crate::{Error, Result};
use crate::uri::SymbolUri;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Symbol kinds shared by all languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// File-level module, root of a file's symbol tree
    Module,
    /// Class, struct, enum, trait, interface
    Class,
    /// Free or nested function
    Function,
    /// Function owned by a class
    Method,
}

impl SymbolKind {
    /// Get the string representation of the symbol kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
        }
    }

    /// Get all symbol kinds
    pub fn all() -> &'static [SymbolKind] {
        &[
            SymbolKind::Module,
            SymbolKind::Class,
            SymbolKind::Function,
            SymbolKind::Method,
        ]
    }

    /// Whether symbols of this kind contain executable bodies that can make calls
    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }
}

impl FromStr for SymbolKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "module" | "namespace" | "package" | "file" => Ok(SymbolKind::Module),
            "class" | "struct" | "trait" | "interface" | "enum" => Ok(SymbolKind::Class),
            "function" | "fn" | "def" | "func" => Ok(SymbolKind::Function),
            "method" => Ok(SymbolKind::Method),
            _ => Err(Error::InvalidUri(format!("Unknown symbol kind: {}", s))),
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dense, stable identifier of a symbol inside one [`RepositoryGraph`](crate::RepositoryGraph).
///
/// Ids are assigned by the assembler in graph order, so the same input
/// always yields the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// Index into the graph's symbol table
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for SymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A symbol in the repository graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    /// Position in the graph's symbol table
    pub id: SymbolId,
    /// Stable textual identity
    pub uri: SymbolUri,
    /// The kind of symbol
    pub kind: SymbolKind,
    /// Symbol name (just the identifier, not qualified)
    pub name: String,
    /// Owner chain joined with `.`; the dotted module path for modules
    pub qualified_name: String,
    /// File path relative to repository root
    pub path: String,
    /// Starting line number (1-indexed)
    pub line_start: u32,
    /// Ending line number (1-indexed, inclusive)
    pub line_end: u32,
    /// Owning symbol; `None` only for Module symbols
    pub owner: Option<SymbolId>,
    /// Base classes, superclasses or embedded types as written (classes only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    /// Parameter names in declaration order (callables only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
}

impl Symbol {
    /// Get a short description for display
    pub fn short_description(&self) -> String {
        format!("{} {} ({}:{})", self.kind, self.qualified_name, self.path, self.line_start)
    }

    /// Whether `line` falls within this symbol's span
    pub fn contains_line(&self, line: u32) -> bool {
        self.line_start <= line && line <= self.line_end
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_kind_roundtrip() {
        for kind in SymbolKind::all() {
            let parsed: SymbolKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_symbol_kind_aliases() {
        assert_eq!(SymbolKind::from_str("struct").unwrap(), SymbolKind::Class);
        assert_eq!(SymbolKind::from_str("def").unwrap(), SymbolKind::Function);
        assert_eq!(SymbolKind::from_str("namespace").unwrap(), SymbolKind::Module);
        assert!(SymbolKind::from_str("variable").is_err());
    }

    #[test]
    fn test_callable_kinds() {
        assert!(SymbolKind::Function.is_callable());
        assert!(SymbolKind::Method.is_callable());
        assert!(!SymbolKind::Class.is_callable());
        assert!(!SymbolKind::Module.is_callable());
    }

    #[test]
    fn test_contains_line() {
        let symbol = Symbol {
            id: SymbolId(0),
            uri: SymbolUri::new("repo", "a.py", SymbolKind::Function, "f", 3),
            kind: SymbolKind::Function,
            name: "f".to_string(),
            qualified_name: "f".to_string(),
            path: "a.py".to_string(),
            line_start: 3,
            line_end: 5,
            owner: Some(SymbolId(1)),
            bases: Vec::new(),
            params: vec!["token".to_string()],
        };
        assert!(symbol.contains_line(3));
        assert!(symbol.contains_line(5));
        assert!(!symbol.contains_line(6));
        assert_eq!(symbol.short_description(), "function f (a.py:3)");
    }
}
