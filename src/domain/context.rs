//! Context Classification
//!
//! Decides whether a call site executes inside orchestrator code, either
//! directly in an entry function or transitively through the call graph.

use crate::domain::callgraph::{CallGraph, Reachability};
use crate::domain::function::{CallSite, FunctionDeclaration, FunctionId};
use crate::domain::project::AnalysisProject;

/// Read-only view over one run. The root-reachability set is computed once
/// at construction; every query afterwards is a lookup.
pub struct ContextClassifier<'p> {
    project: &'p AnalysisProject,
    reachable: Reachability,
}

impl<'p> ContextClassifier<'p> {
    pub fn new(project: &'p AnalysisProject, graph: &CallGraph) -> Self {
        let roots = project.entry_points().map(|f| f.id);
        let reachable = graph.reachable(roots);
        Self { project, reachable }
    }

    pub fn is_in_orchestrator_context(&self, site: &CallSite) -> bool {
        match self.enclosing(site) {
            Some(func) if func.is_orchestration_entry() => true,
            Some(func) => self.reachable.contains(func.id),
            None => false,
        }
    }

    pub fn is_marked_deterministic(&self, site: &CallSite) -> bool {
        site.statement_marked
            || self
                .enclosing(site)
                .map_or(false, |f| f.is_marked_deterministic())
    }

    /// Entry function through which the enclosing declaration is reached.
    pub fn origin(&self, site: &CallSite) -> Option<&'p FunctionDeclaration> {
        self.reachable
            .origin(site.enclosing)
            .and_then(|id| self.project.function(id))
    }

    pub fn is_reachable(&self, id: FunctionId) -> bool {
        self.reachable.contains(id)
    }

    pub fn reachable_count(&self) -> usize {
        self.reachable.len()
    }

    fn enclosing(&self, site: &CallSite) -> Option<&'p FunctionDeclaration> {
        self.project.function(site.enclosing)
    }
}
