use crate::domain::{
    AnalysisProject, AnalysisReport, CallTarget, FrameworkVersion, FrontendError, ParsedUnit,
    Resolution, ResolutionScope, RuleSet, SourceUnit,
};

/// Turns one source file into declarations with unresolved call sites.
pub trait SourceFrontend: Send + Sync {
    fn parse(&self, unit: &SourceUnit) -> Result<ParsedUnit, FrontendError>;
}

/// Maps a call expression to a fully-qualified symbol. Must be pure: the
/// same scope and target always give the same answer.
pub trait SymbolResolver: Send + Sync {
    fn resolve(&self, scope: &ResolutionScope, target: &CallTarget) -> Resolution;
}

/// Builds the immutable project snapshot a run analyzes: parses every
/// unit, resolves every call site. Units that fail to parse are recorded
/// as skipped.
pub trait ProjectAssembler: Send + Sync {
    fn assemble(
        &self,
        name: &str,
        units: &[SourceUnit],
        framework_version: Option<FrameworkVersion>,
    ) -> AnalysisProject;
}

pub trait DiagnosticExporter {
    fn render(&self, report: &AnalysisReport, rules: &RuleSet) -> anyhow::Result<String>;

    fn export(&self, report: &AnalysisReport, rules: &RuleSet, path: &str) -> anyhow::Result<()> {
        let content = self.render(report, rules)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
