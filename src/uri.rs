//! Symbol URI - Stable textual identity for every extracted symbol
//!
//! Format: `repomap://<repo>/<path>#<kind>:<qualified_name>@<line>[:<column>]`
//!
//! Examples:
//! - `repomap://myrepo/src/auth.py#function:validate_token@42`
//! - `repomap://myrepo/lib/db.js#method:DatabaseClient.connect@10`
//!
//! The start line is part of the identity so that two definitions with the
//! same qualified name in one file stay distinct. Definitions that also share
//! a line (`function f(){} function f(){}`) carry their start column too.

use crate::{Error, Result};
use crate::symbol::SymbolKind;
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// Stable URI for a symbol.
///
/// Per-file records reference symbols by URI; the assembler maps URIs to
/// dense [`SymbolId`](crate::SymbolId)s and treats an unknown URI as a
/// consistency violation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolUri {
    /// Repository identifier
    pub repo: String,
    /// File path relative to repo root
    pub path: String,
    /// Symbol kind
    pub kind: SymbolKind,
    /// Qualified name (`Class.method`, `function`, or the dotted module path)
    pub qualified_name: String,
    /// Line number where the symbol starts (1-indexed)
    pub line: u32,
    /// Start column (1-indexed), only set when the line alone is ambiguous
    pub column: Option<u32>,
}

impl SymbolUri {
    /// Create a new SymbolUri
    pub fn new(
        repo: impl Into<String>,
        path: impl Into<String>,
        kind: SymbolKind,
        qualified_name: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            repo: repo.into(),
            path: path.into(),
            kind,
            qualified_name: qualified_name.into(),
            line,
            column: None,
        }
    }

    /// Disambiguate by start column
    pub fn with_column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    /// Parse a URI string into a SymbolUri
    ///
    /// Expected format: `repomap://<repo>/<path>#<kind>:<qualified_name>@<line>[:<column>]`
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri
            .strip_prefix("repomap://")
            .ok_or_else(|| Error::InvalidUri("URI must start with repomap://".to_string()))?;

        let (repo_path, fragment) = uri
            .split_once('#')
            .ok_or_else(|| Error::InvalidUri("URI must contain # fragment".to_string()))?;

        let (repo, path) = repo_path
            .split_once('/')
            .ok_or_else(|| Error::InvalidUri("URI must contain repo/path".to_string()))?;

        let (kind_name, position) = fragment
            .rsplit_once('@')
            .ok_or_else(|| Error::InvalidUri("Fragment must contain @line".to_string()))?;

        let (kind_str, qualified_name) = kind_name
            .split_once(':')
            .ok_or_else(|| Error::InvalidUri("Fragment must contain kind:name".to_string()))?;

        let kind = SymbolKind::from_str(kind_str)?;
        let (line_str, column_str) = match position.split_once(':') {
            Some((line, column)) => (line, Some(column)),
            None => (position, None),
        };
        let line: u32 = line_str
            .parse()
            .map_err(|_| Error::InvalidUri(format!("Invalid line number: {}", line_str)))?;
        let column = column_str
            .map(|c| {
                c.parse::<u32>()
                    .map_err(|_| Error::InvalidUri(format!("Invalid column number: {}", c)))
            })
            .transpose()?;

        Ok(Self {
            repo: repo.to_string(),
            path: path.to_string(),
            kind,
            qualified_name: qualified_name.to_string(),
            line,
            column,
        })
    }

    /// Convert to URI string
    pub fn to_uri_string(&self) -> String {
        let uri = format!(
            "repomap://{}/{}#{}:{}@{}",
            self.repo,
            self.path,
            self.kind.as_str(),
            self.qualified_name,
            self.line
        );
        match self.column {
            Some(column) => format!("{}:{}", uri, column),
            None => uri,
        }
    }
}

impl fmt::Display for SymbolUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri_string())
    }
}

impl FromStr for SymbolUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for SymbolUri {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_uri_string())
    }
}

impl<'de> Deserialize<'de> for SymbolUri {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SymbolUri::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_format() {
        let uri =
            SymbolUri::new("myrepo", "src/auth.py", SymbolKind::Function, "validate_token", 42);
        assert_eq!(uri.to_uri_string(), "repomap://myrepo/src/auth.py#function:validate_token@42");
    }

    #[test]
    fn test_uri_parse() {
        let uri = SymbolUri::parse("repomap://repo/lib/db.js#method:Client.connect@10").unwrap();
        assert_eq!(uri.repo, "repo");
        assert_eq!(uri.path, "lib/db.js");
        assert_eq!(uri.kind, SymbolKind::Method);
        assert_eq!(uri.qualified_name, "Client.connect");
        assert_eq!(uri.line, 10);
    }

    #[test]
    fn test_same_name_different_line_is_distinct() {
        let a = SymbolUri::new("r", "m.py", SymbolKind::Function, "f", 1);
        let b = SymbolUri::new("r", "m.py", SymbolKind::Function, "f", 9);
        assert_ne!(a, b);
    }

    #[test]
    fn test_column_disambiguates_same_line() {
        let a = SymbolUri::new("r", "a.js", SymbolKind::Function, "f", 1).with_column(1);
        let b = SymbolUri::new("r", "a.js", SymbolKind::Function, "f", 1).with_column(28);
        assert_ne!(a, b);
        assert_eq!(b.to_uri_string(), "repomap://r/a.js#function:f@1:28");
        assert_eq!(SymbolUri::parse(&b.to_uri_string()).unwrap(), b);
        assert_eq!(SymbolUri::parse("repomap://r/a.js#function:f@1").unwrap().column, None);
    }

    #[test]
    fn test_invalid_uri() {
        assert!(SymbolUri::parse("invalid").is_err());
        assert!(SymbolUri::parse("file://repo/a.py#function:f@1").is_err());
        assert!(SymbolUri::parse("repomap://repo/path").is_err());
        assert!(SymbolUri::parse("repomap://repo/a.py#function:f@x").is_err());
        assert!(SymbolUri::parse("repomap://repo/a.py#function:f@1:y").is_err());
    }
}
