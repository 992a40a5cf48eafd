//! Language Adapter Framework
//!
//! Each language provides a Tree-sitter grammar, a node classifier and its
//! module-path conventions. The extractor and linker never see
//! language-specific logic.

pub mod framework;
pub mod python;
pub mod javascript;
pub mod rust;
pub mod go;

pub use framework::{
    default_registry, AdapterRegistry, CandidateMatch, Definition, DefinitionKind,
    LanguageAdapter, ModuleCandidate, ModuleRoot, ModuleRoots, NodeRole,
};
pub use go::GoAdapter;
pub use javascript::JavaScriptAdapter;
pub use python::PythonAdapter;
pub use rust::RustAdapter;
