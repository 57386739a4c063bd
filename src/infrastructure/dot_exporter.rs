//! Call Graph DOT Exporter
//!
//! Exports the project call graph as Graphviz DOT. Orchestrator entries,
//! functions reachable from them, and the rest are styled apart.

use crate::domain::callgraph::{CallGraph, Reachability};
use crate::domain::function::FunctionId;
use crate::domain::project::AnalysisProject;
use std::io::Result;

pub struct CallGraphDotExporter;

enum NodeKind {
    Entry,
    Reachable,
    Other,
}

impl CallGraphDotExporter {
    pub fn export(project: &AnalysisProject, graph: &CallGraph, path: &str) -> Result<()> {
        std::fs::write(path, Self::to_dot(project, graph))
    }

    pub fn to_dot(project: &AnalysisProject, graph: &CallGraph) -> String {
        let reachable = graph.reachable(project.entry_points().map(|f| f.id));

        let mut lines = vec![
            "digraph CallGraph {".to_string(),
            "    rankdir=LR;".to_string(),
            "    node [fontname=\"Helvetica\", fontsize=11, shape=box];".to_string(),
            String::new(),
        ];

        for node in &graph.nodes {
            let is_entry = project
                .function(node.id)
                .map_or(false, |f| f.is_orchestration_entry());
            let kind = Self::classify(is_entry, &reachable, node.id);
            let (fill, style) = Self::node_style(&kind);
            lines.push(format!(
                "    n{} [label=\"{}\", style=\"{}\", fillcolor=\"{}\"];",
                node.id.0,
                Self::escape_label(&node.name),
                style,
                fill
            ));
        }

        lines.push(String::new());
        for node in &graph.nodes {
            for callee in &node.callees {
                lines.push(format!("    n{} -> n{};", node.id.0, callee.0));
            }
        }
        lines.push("}".to_string());
        lines.join("\n")
    }

    fn classify(is_entry: bool, reachable: &Reachability, id: FunctionId) -> NodeKind {
        if is_entry {
            NodeKind::Entry
        } else if reachable.contains(id) {
            NodeKind::Reachable
        } else {
            NodeKind::Other
        }
    }

    fn node_style(kind: &NodeKind) -> (&'static str, &'static str) {
        match kind {
            NodeKind::Entry => ("#a6e3a1", "filled,rounded"), // Green
            NodeKind::Reachable => ("#89b4fa", "filled"),     // Blue
            NodeKind::Other => ("#6c7086", "filled,dashed"),  // Gray
        }
    }

    fn escape_label(label: &str) -> String {
        label.replace('\\', "\\\\").replace('"', "\\\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::function::{CallSite, FunctionDeclaration, FunctionTag};
    use crate::domain::symbol::{Resolution, SourceLocation};

    #[test]
    fn test_dot_styles_entry_reachable_and_other() {
        let loc = SourceLocation::new("lib.rs", 1, 1);
        let mut entry = FunctionDeclaration::new(FunctionId(0), "app::flow", loc.clone())
            .with_tag(FunctionTag::OrchestrationEntry);
        entry
            .call_sites
            .push(CallSite::new(FunctionId(0), Resolution::resolved("app::step"), loc.clone()));
        let step = FunctionDeclaration::new(FunctionId(1), "app::step", loc.clone());
        let unused = FunctionDeclaration::new(FunctionId(2), "app::unused", loc);

        let project = AnalysisProject::new("app", vec![entry, step, unused], None);
        let graph = CallGraph::build(project.functions());
        let dot = CallGraphDotExporter::to_dot(&project, &graph);

        assert!(dot.starts_with("digraph CallGraph {"));
        assert!(dot.contains("n0 [label=\"app::flow\", style=\"filled,rounded\", fillcolor=\"#a6e3a1\"];"));
        assert!(dot.contains("n1 [label=\"app::step\", style=\"filled\", fillcolor=\"#89b4fa\"];"));
        assert!(dot.contains("fillcolor=\"#6c7086\""));
        assert!(dot.contains("n0 -> n1;"));
    }
}
