//! Per-file binding model
//!
//! Adapters emit facts about a file (the imports it makes, the names those
//! imports bind, the call sites inside its callables); the linker resolves
//! them against the whole run once every file has been extracted.

use serde::Serialize;

/// What an import makes visible under a local name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "member", rename_all = "lowercase")]
pub enum BindingKind {
    /// The imported module itself (`import numpy as np`, Go `import "x/util"`)
    Module,
    /// A named member of the module (`from m import f`, `use m::f`)
    Member(String),
    /// Everything exported by the module (`from m import *`, `use m::*`)
    Wildcard,
}

/// A name introduced into a file by an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    /// Name usable inside the importing file
    pub local: String,
    pub kind: BindingKind,
}

impl Binding {
    pub fn module(local: impl Into<String>) -> Self {
        Self { local: local.into(), kind: BindingKind::Module }
    }

    pub fn member(local: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            kind: BindingKind::Member(member.into()),
        }
    }

    pub fn wildcard() -> Self {
        Self { local: "*".to_string(), kind: BindingKind::Wildcard }
    }
}

/// An import reference found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Raw statement text
    pub raw: String,
    /// Module reference as written (`pkg.mod`, `./util.js`, `crate::a::b`)
    pub module: String,
    /// Names the import binds
    pub bindings: Vec<Binding>,
    /// Line of the statement (1-indexed)
    pub line: u32,
}

impl Import {
    pub fn new(raw: impl Into<String>, module: impl Into<String>, line: u32) -> Self {
        Self {
            raw: raw.into(),
            module: module.into(),
            bindings: Vec::new(),
            line,
        }
    }

    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }
}

/// Syntactic shape of a call's callee expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// `f()`
    Name(String),
    /// `self.f()`, `this.f()`, `Self::f()`, `recv.f()` for a Go receiver
    SelfMember(String),
    /// One-level attribute or path: `m.f()`, `Type::f()`
    Member { receiver: String, name: String },
    /// Deeper chains or computed callees: `a.b.c()`, `fns[0]()`, `f()()`
    Dynamic,
}

/// A call expression inside a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub target: CallTarget,
    /// Callee expression text, kept for unresolved edges
    pub text: String,
    /// Line of the call (1-indexed)
    pub line: u32,
}

impl CallSite {
    pub fn new(target: CallTarget, text: impl Into<String>, line: u32) -> Self {
        Self { target, text: text.into(), line }
    }
}
