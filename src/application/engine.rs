//! Rule Engine
//!
//! Evaluates every registered rule against every call site of a project
//! snapshot. Functions are evaluated in parallel; findings are collected in
//! a shared sink and returned in a deterministic order.

use crate::domain::callgraph::CallGraph;
use crate::domain::context::ContextClassifier;
use crate::domain::diagnostic::{AnalysisReport, Diagnostic, DiagnosticSink, Severity};
use crate::domain::function::CallSite;
use crate::domain::project::AnalysisProject;
use crate::domain::rule::{RuleSet, RuleVariant, UNDETERMINED_VERSION_ID};
use crate::domain::version::select_variant;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Cooperative cancellation, checked before each function is evaluated.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct AnalysisEngine {
    rules: RuleSet,
    report_undetermined_version: bool,
}

impl AnalysisEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            report_undetermined_version: true,
        }
    }

    pub fn with_undetermined_version_report(mut self, enabled: bool) -> Self {
        self.report_undetermined_version = enabled;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn analyze(&self, project: &AnalysisProject) -> Vec<Diagnostic> {
        self.run(project, &CancellationToken::new()).diagnostics
    }

    pub fn run(&self, project: &AnalysisProject, cancel: &CancellationToken) -> AnalysisReport {
        let graph = CallGraph::build(project.functions());
        let classifier = ContextClassifier::new(project, &graph);
        let variant = select_variant(project.framework_version);
        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edge_count(),
            reachable = classifier.reachable_count(),
            "Call graph built"
        );

        let sink = DiagnosticSink::new();
        if variant.is_none() && self.rules.any_requires_version() {
            let skipped: Vec<&str> = self
                .rules
                .iter()
                .filter(|r| r.requires_version())
                .map(|r| r.id.as_str())
                .collect();
            warn!(
                "Framework version of '{}' is undetermined; skipping {}",
                project.name,
                skipped.join(", ")
            );
            if self.report_undetermined_version {
                sink.push(Diagnostic::new(
                    UNDETERMINED_VERSION_ID,
                    Severity::Info,
                    None,
                    format!(
                        "Could not determine the durable framework version of '{}'; rules {} were not evaluated.",
                        project.name,
                        skipped.join(", ")
                    ),
                ));
            }
        }

        let analyzed = AtomicUsize::new(0);
        project.functions().par_iter().for_each(|func| {
            if cancel.is_cancelled() {
                return;
            }
            analyzed.fetch_add(1, Ordering::Relaxed);
            for site in &func.call_sites {
                self.evaluate(site, &classifier, variant, &sink);
            }
        });

        let functions_analyzed = analyzed.into_inner();
        let cancelled = functions_analyzed < project.functions().len();
        let diagnostics = sink.into_sorted();
        info!(
            diagnostics = diagnostics.len(),
            functions = functions_analyzed,
            cancelled,
            "Analysis of '{}' finished",
            project.name
        );

        AnalysisReport {
            project: project.name.clone(),
            diagnostics,
            functions_analyzed,
            orchestrator_reachable: classifier.reachable_count(),
            framework_version: project.framework_version,
            skipped_units: project.skipped_units.clone(),
            cancelled,
        }
    }

    fn evaluate(
        &self,
        site: &CallSite,
        classifier: &ContextClassifier<'_>,
        variant: Option<RuleVariant>,
        sink: &DiagnosticSink,
    ) {
        let Some(symbol) = site.target.qualified_name() else {
            trace!(expression = %site.expression, location = %site.location, "Unresolved call");
            return;
        };

        for rule in self.rules.iter() {
            if rule.matches(symbol).is_none() {
                continue;
            }
            if !classifier.is_in_orchestrator_context(site) {
                trace!(rule = %rule.id, symbol, "Outside orchestrator context");
                continue;
            }
            if classifier.is_marked_deterministic(site) {
                debug!(rule = %rule.id, location = %site.location, "Suppressed by deterministic marker");
                continue;
            }
            let Some(message) = rule.format_message(variant, symbol) else {
                continue;
            };

            let mut diagnostic =
                Diagnostic::new(rule.id.clone(), rule.severity, Some(site.location.clone()), message)
                    .with_symbol(symbol);
            if let Some(origin) = classifier.origin(site) {
                diagnostic = diagnostic.with_origin(origin.qualified_name.clone());
            }
            sink.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::function::{FunctionDeclaration, FunctionId, FunctionTag};
    use crate::domain::rule::{GUID_RULE_ID, TIMER_RULE_ID};
    use crate::domain::symbol::{Resolution, SourceLocation};
    use crate::domain::version::FrameworkVersion;

    fn at(line: usize) -> SourceLocation {
        SourceLocation::new("src/lib.rs", line, 5)
    }

    fn call(symbol: &str, line: usize) -> CallSite {
        CallSite::new(FunctionId(0), Resolution::resolved(symbol), at(line))
    }

    fn declaration(name: &str, calls: Vec<CallSite>) -> FunctionDeclaration {
        let mut decl = FunctionDeclaration::new(FunctionId(0), name, at(1));
        decl.call_sites = calls;
        decl
    }

    #[test]
    fn test_transitive_violation_with_origin() {
        let entry = declaration("app::flow", vec![call("app::helper", 2)])
            .with_tag(FunctionTag::OrchestrationEntry);
        let helper = declaration("app::helper", vec![call("uuid::Uuid::new_v4", 10)]);
        let project = AnalysisProject::new("app", vec![entry, helper], Some(FrameworkVersion::V2));

        let diagnostics = AnalysisEngine::new(RuleSet::builtin()).analyze(&project);
        assert_eq!(diagnostics.len(), 1);
        let d = &diagnostics[0];
        assert_eq!(d.rule_id, GUID_RULE_ID);
        assert_eq!(d.location, Some(at(10)));
        assert_eq!(d.origin.as_deref(), Some("app::flow"));
        assert_eq!(
            d.message,
            "'uuid::Uuid::new_v4' violates the orchestrator deterministic code constraint."
        );
    }

    #[test]
    fn test_unreachable_and_marked_sites_are_quiet() {
        let entry = declaration("app::flow", vec![call("std::thread::sleep", 3).marked()])
            .with_tag(FunctionTag::OrchestrationEntry);
        let activity = declaration("app::activity", vec![call("std::thread::sleep", 8)]);
        let project = AnalysisProject::new("app", vec![entry, activity], Some(FrameworkVersion::V1));

        assert!(AnalysisEngine::new(RuleSet::builtin()).analyze(&project).is_empty());
    }

    #[test]
    fn test_undetermined_version_skips_timer_rule_only() {
        let entry = declaration(
            "app::flow",
            vec![call("std::thread::sleep", 3), call("uuid::Uuid::now_v7", 4)],
        )
        .with_tag(FunctionTag::OrchestrationEntry);
        let project = AnalysisProject::new("app", vec![entry], None);

        let diagnostics = AnalysisEngine::new(RuleSet::builtin()).analyze(&project);
        let ids: Vec<&str> = diagnostics.iter().map(|d| d.rule_id.as_str()).collect();
        assert_eq!(ids, vec![UNDETERMINED_VERSION_ID, GUID_RULE_ID]);
        assert!(diagnostics[0].location.is_none());
        assert_eq!(diagnostics[0].severity, Severity::Info);

        let quiet = AnalysisEngine::new(RuleSet::builtin())
            .with_undetermined_version_report(false)
            .analyze(&project);
        assert_eq!(quiet.len(), 1);
        assert!(!quiet.iter().any(|d| d.rule_id == TIMER_RULE_ID));
    }

    #[test]
    fn test_cancelled_run_reports_partial() {
        let entry = declaration("app::flow", vec![call("uuid::Uuid::new_v4", 2)])
            .with_tag(FunctionTag::OrchestrationEntry);
        let project = AnalysisProject::new("app", vec![entry], Some(FrameworkVersion::V2));

        let token = CancellationToken::new();
        token.cancel();
        let report = AnalysisEngine::new(RuleSet::builtin()).run(&project, &token);
        assert!(report.cancelled);
        assert_eq!(report.functions_analyzed, 0);
        assert!(report.diagnostics.is_empty());
    }
}
