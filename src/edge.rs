//! Edge types - Relationships recovered between files and symbols
//!
//! Two relationships are tracked:
//! - `ImportEdge`: file → internal file, or file → external package
//! - `CallEdge`: callable → callable (resolved) or callable → name (unresolved)

use crate::symbol::SymbolId;
use serde::{Deserialize, Serialize};

/// Where an import points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "lowercase")]
pub enum ImportTarget {
    /// A source file present in the current analysis run
    Internal(String),
    /// A third-party or standard-library package name
    External(String),
}

impl ImportTarget {
    /// Check if this target is a file of the analyzed repository
    pub fn is_internal(&self) -> bool {
        matches!(self, ImportTarget::Internal(_))
    }

    /// The internal path, if any
    pub fn internal_path(&self) -> Option<&str> {
        match self {
            ImportTarget::Internal(path) => Some(path),
            ImportTarget::External(_) => None,
        }
    }

    /// Get the path or package name
    pub fn as_str(&self) -> &str {
        match self {
            ImportTarget::Internal(s) | ImportTarget::External(s) => s,
        }
    }
}

impl std::fmt::Display for ImportTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportTarget::Internal(path) => write!(f, "internal:{}", path),
            ImportTarget::External(name) => write!(f, "external:{}", name),
        }
    }
}

/// An import statement (or one reference of a multi-reference statement).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportEdge {
    /// Importing file (relative path)
    pub source: String,
    /// Raw statement text as written
    pub raw: String,
    /// Module reference extracted from the statement
    pub module: String,
    /// Classified target
    pub target: ImportTarget,
    /// Line of the statement (1-indexed)
    pub line: u32,
}

/// The callee side of a call edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "callee", rename_all = "lowercase")]
pub enum Callee {
    /// Linked to a symbol of the graph
    Resolved(SymbolId),
    /// Resolution failed; the literal callee text is kept
    Unresolved(String),
}

impl Callee {
    /// The resolved symbol id, if any
    pub fn symbol(&self) -> Option<SymbolId> {
        match self {
            Callee::Resolved(id) => Some(*id),
            Callee::Unresolved(_) => None,
        }
    }
}

/// A call from a function or method to another symbol.
///
/// Two calls between the same pair at different lines are distinct edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallEdge {
    /// Calling function or method
    pub caller: SymbolId,
    /// Called symbol or literal name
    pub callee: Callee,
    /// Line of the call site (1-indexed)
    pub line: u32,
}

impl CallEdge {
    /// Create a new call edge
    pub fn new(caller: SymbolId, callee: Callee, line: u32) -> Self {
        Self { caller, callee, line }
    }

    /// Check if the callee was linked to a symbol
    pub fn is_resolved(&self) -> bool {
        matches!(self.callee, Callee::Resolved(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_target_accessors() {
        let internal = ImportTarget::Internal("pkg/util.py".to_string());
        let external = ImportTarget::External("requests".to_string());

        assert!(internal.is_internal());
        assert_eq!(internal.internal_path(), Some("pkg/util.py"));
        assert!(!external.is_internal());
        assert_eq!(external.internal_path(), None);
        assert_eq!(external.as_str(), "requests");
        assert_eq!(external.to_string(), "external:requests");
    }

    #[test]
    fn test_call_edges_distinct_by_line() {
        let a = CallEdge::new(SymbolId(1), Callee::Resolved(SymbolId(2)), 10);
        let b = CallEdge::new(SymbolId(1), Callee::Resolved(SymbolId(2)), 11);
        assert_ne!(a, b);
        assert!(a.is_resolved());
        assert_eq!(a.callee.symbol(), Some(SymbolId(2)));
    }

    #[test]
    fn test_unresolved_callee() {
        let edge = CallEdge::new(SymbolId(1), Callee::Unresolved("print".to_string()), 3);
        assert!(!edge.is_resolved());
        assert_eq!(edge.callee.symbol(), None);
    }

    #[test]
    fn test_target_serialization_shape() {
        let json = serde_json::to_string(&ImportTarget::Internal("a.py".to_string())).unwrap();
        assert_eq!(json, r#"{"kind":"internal","target":"a.py"}"#);
    }
}
