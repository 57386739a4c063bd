// Application layer: wires project assembly, version resolution and the
// rule engine into one analysis run.

pub mod engine;

pub use engine::{AnalysisEngine, CancellationToken};

use crate::domain::diagnostic::AnalysisReport;
use crate::domain::project::AnalysisProject;
use crate::domain::source::ProjectSources;
use crate::domain::version::VersionResolver;
use crate::ports::{DiagnosticExporter, ProjectAssembler};
use anyhow::Result;
use tracing::info;

pub struct AnalyzeUsecase<'a> {
    pub assembler: &'a dyn ProjectAssembler,
    pub versions: &'a VersionResolver,
    pub engine: &'a AnalysisEngine,
}

impl<'a> AnalyzeUsecase<'a> {
    pub fn run(&self, sources: &ProjectSources, cancel: &CancellationToken) -> AnalysisReport {
        self.run_project(sources, cancel).1
    }

    /// Like `run`, also handing back the assembled project so callers can
    /// render it without assembling a second time.
    pub fn run_project(
        &self,
        sources: &ProjectSources,
        cancel: &CancellationToken,
    ) -> (AnalysisProject, AnalysisReport) {
        let version = self.versions.resolve(&sources.references);
        match version {
            Some(v) => info!("Framework version of '{}': {}", sources.name, v),
            None => info!("Framework version of '{}' is undetermined", sources.name),
        }
        let project = self.assembler.assemble(&sources.name, &sources.units, version);
        let report = self.engine.run(&project, cancel);
        (project, report)
    }

    /// Run and render with `exporter`; written to `export_path` when given.
    pub fn run_and_export(
        &self,
        sources: &ProjectSources,
        exporter: &dyn DiagnosticExporter,
        export_path: Option<&str>,
    ) -> Result<(AnalysisReport, String)> {
        let report = self.run(sources, &CancellationToken::new());
        let rendered = exporter.render(&report, self.engine.rules())?;
        if let Some(path) = export_path {
            std::fs::write(path, &rendered)?;
        }
        Ok((report, rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{RuleSet, TIMER_RULE_ID};
    use crate::domain::source::SourceUnit;
    use crate::domain::version::FrameworkReference;
    use crate::domain::version::FrameworkVersion;
    use crate::infrastructure::{JsonExporter, ProjectBuilder, SynFrontend};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAssembler {
        inner: ProjectBuilder<SynFrontend>,
        calls: AtomicUsize,
    }

    impl ProjectAssembler for CountingAssembler {
        fn assemble(
            &self,
            name: &str,
            units: &[SourceUnit],
            framework_version: Option<FrameworkVersion>,
        ) -> AnalysisProject {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.assemble(name, units, framework_version)
        }
    }

    #[test]
    fn test_version_from_references_selects_message() {
        let code = "#[durable_execution]\nasync fn flow() { std::thread::sleep(d); }";
        let sources = ProjectSources::new("app", vec![SourceUnit::new("app", "src/lib.rs", code)])
            .with_references(vec![FrameworkReference::new("app", "aws-durable-execution-sdk", "0.3")]);

        let assembler = ProjectBuilder::new(SynFrontend::default());
        let versions = VersionResolver::default();
        let engine = AnalysisEngine::new(RuleSet::builtin());
        let usecase = AnalyzeUsecase {
            assembler: &assembler,
            versions: &versions,
            engine: &engine,
        };

        let (report, rendered) = usecase.run_and_export(&sources, &JsonExporter, None).unwrap();
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].rule_id, TIMER_RULE_ID);
        assert!(report.diagnostics[0].message.contains("ctx.create_timer"));
        assert!(rendered.contains("\"framework_version\": \"v1\""));
    }

    #[test]
    fn test_run_project_assembles_once() {
        let code = "#[durable_execution]\nasync fn flow() { uuid::Uuid::new_v4(); }";
        let sources = ProjectSources::new("app", vec![SourceUnit::new("app", "src/lib.rs", code)]);
        let assembler = CountingAssembler {
            inner: ProjectBuilder::new(SynFrontend::default()),
            calls: AtomicUsize::new(0),
        };
        let versions = VersionResolver::default().pinned(Some(FrameworkVersion::V2));
        let engine = AnalysisEngine::new(RuleSet::builtin());
        let usecase = AnalyzeUsecase {
            assembler: &assembler,
            versions: &versions,
            engine: &engine,
        };

        let (project, report) = usecase.run_project(&sources, &CancellationToken::new());
        assert_eq!(assembler.calls.load(Ordering::SeqCst), 1);
        assert!(project.find("app::flow").is_some());
        assert_eq!(report.diagnostics.len(), 1);
    }
}
