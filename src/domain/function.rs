// Function declarations and call sites: the nodes and raw edges of analysis.

use crate::domain::symbol::{Resolution, SourceLocation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Declaration identity: index into `AnalysisProject::functions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId(pub usize);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FunctionTag {
    /// Replayed by the runtime; must be deterministic.
    OrchestrationEntry,
    /// Explicit opt-out from determinism checks.
    DeterministicMarked,
}

/// A named, analyzable unit of code.
#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub id: FunctionId,
    /// e.g. `my_app::orders::OrderService::process`
    pub qualified_name: String,
    pub tags: BTreeSet<FunctionTag>,
    pub location: SourceLocation,
    pub call_sites: Vec<CallSite>,
}

impl FunctionDeclaration {
    pub fn new(id: FunctionId, qualified_name: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            id,
            qualified_name: qualified_name.into(),
            tags: BTreeSet::new(),
            location,
            call_sites: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: FunctionTag) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn has_tag(&self, tag: FunctionTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn is_orchestration_entry(&self) -> bool {
        self.has_tag(FunctionTag::OrchestrationEntry)
    }

    pub fn is_marked_deterministic(&self) -> bool {
        self.has_tag(FunctionTag::DeterministicMarked)
    }

    /// Short name for display (last path segment).
    pub fn name(&self) -> &str {
        self.qualified_name
            .rsplit("::")
            .next()
            .unwrap_or(&self.qualified_name)
    }
}

/// A single invocation expression inside a declaration's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub target: Resolution,
    pub location: SourceLocation,
    pub enclosing: FunctionId,
    /// The callee as written in source.
    pub expression: String,
    /// The statement holding this call carries a deterministic marker.
    pub statement_marked: bool,
}

impl CallSite {
    pub fn new(enclosing: FunctionId, target: Resolution, location: SourceLocation) -> Self {
        let expression = target.qualified_name().unwrap_or("<unresolved>").to_string();
        Self {
            target,
            location,
            enclosing,
            expression,
            statement_marked: false,
        }
    }

    pub fn marked(mut self) -> Self {
        self.statement_marked = true;
        self
    }
}
