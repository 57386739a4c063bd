//! Symbol Resolution Types
//!
//! Fully-qualified symbols, source locations, and the inputs a
//! `SymbolResolver` needs to turn a call expression into a symbol.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Outcome of resolving a call-site reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// Fully-qualified path, e.g. `uuid::Uuid::new_v4`.
    Resolved(String),
    /// Defined outside what we can see, or ambiguous.
    Unresolved,
}

impl Resolution {
    pub fn resolved(path: impl Into<String>) -> Self {
        Resolution::Resolved(path.into())
    }

    pub fn from_segments(segments: &[String]) -> Self {
        if segments.is_empty() {
            Resolution::Unresolved
        } else {
            Resolution::Resolved(segments.join("::"))
        }
    }

    pub fn qualified_name(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(name) => Some(name),
            Resolution::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Segment-boundary prefix test: `a::b` is a prefix of `a::b` and `a::b::c`,
/// never of `a::bc`.
pub fn path_starts_with(symbol: &str, prefix: &str) -> bool {
    match symbol.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with("::"),
        None => false,
    }
}

/// Position of a syntax element. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// The callee expression of an invocation, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// `a::b::c(..)`; `absolute` is set for a leading `::`.
    Path { segments: Vec<String>, absolute: bool },
    /// `receiver.method(..)`
    Method { receiver_is_self: bool, method: String },
}

impl CallTarget {
    pub fn path<S: AsRef<str>>(segments: &[S]) -> Self {
        CallTarget::Path {
            segments: segments.iter().map(|s| s.as_ref().to_string()).collect(),
            absolute: false,
        }
    }

    /// The call as written, e.g. `thread::sleep` or `self.step`.
    pub fn display(&self) -> String {
        match self {
            CallTarget::Path { segments, absolute } => {
                let joined = segments.join("::");
                if *absolute {
                    format!("::{}", joined)
                } else {
                    joined
                }
            }
            CallTarget::Method {
                receiver_is_self,
                method,
            } => {
                if *receiver_is_self {
                    format!("self.{}", method)
                } else {
                    format!(".{}", method)
                }
            }
        }
    }
}

/// `use` declarations visible in one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportScope {
    /// Local name -> imported path as written (not yet absolutized).
    pub aliases: HashMap<String, Vec<String>>,
    /// `use a::b::*;` prefixes as written.
    pub globs: Vec<Vec<String>>,
}

impl ImportScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(&self, name: &str) -> Option<&[String]> {
        self.aliases.get(name).map(|v| v.as_slice())
    }

    /// Layers block-local imports over this scope; local names shadow.
    pub fn with_local(&self, local: ImportScope) -> Self {
        let mut scope = self.clone();
        scope.aliases.extend(local.aliases);
        scope.globs.extend(local.globs);
        scope
    }
}

/// Where a call expression lives, as seen by the resolver.
#[derive(Debug, Clone)]
pub struct ResolutionScope {
    pub crate_name: String,
    /// Full module path, starting with the crate name.
    pub module: Vec<String>,
    /// Type of the enclosing `impl`/`trait` block, if any.
    pub self_type: Option<String>,
    pub imports: Arc<ImportScope>,
}

impl ResolutionScope {
    pub fn root(crate_name: impl Into<String>) -> Self {
        let crate_name = crate_name.into();
        Self {
            module: vec![crate_name.clone()],
            crate_name,
            self_type: None,
            imports: Arc::new(ImportScope::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_prefix_respects_segments() {
        assert!(path_starts_with("tokio::time::sleep", "tokio::time::sleep"));
        assert!(path_starts_with("std::thread::sleep", "std::thread"));
        assert!(!path_starts_with("tokio::time::sleep_until", "tokio::time::sleep"));
        assert!(!path_starts_with("app::util::sleep", "std::thread::sleep"));
    }

    #[test]
    fn test_call_target_display() {
        assert_eq!(CallTarget::path(&["Uuid", "new_v4"]).display(), "Uuid::new_v4");
        let method = CallTarget::Method {
            receiver_is_self: true,
            method: "run".to_string(),
        };
        assert_eq!(method.display(), "self.run");
    }

    #[test]
    fn test_resolution_from_empty_segments_is_unresolved() {
        assert_eq!(Resolution::from_segments(&[]), Resolution::Unresolved);
        assert_eq!(
            Resolution::from_segments(&["a".to_string(), "b".to_string()]).qualified_name(),
            Some("a::b")
        );
    }
}
