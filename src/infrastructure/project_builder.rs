use crate::domain::function::{CallSite, FunctionDeclaration, FunctionId};
use crate::domain::project::{AnalysisProject, SkippedUnit};
use crate::domain::source::{ParsedFunction, ParsedUnit, SourceUnit};
use crate::domain::symbol::ResolutionScope;
use crate::domain::version::FrameworkVersion;
use crate::infrastructure::index::SymbolIndex;
use crate::infrastructure::resolver::ScopeResolver;
use crate::ports::{ProjectAssembler, SourceFrontend, SymbolResolver};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Parses and indexes units in parallel, then resolves every call site
/// against the project-wide index.
pub struct ProjectBuilder<F: SourceFrontend> {
    frontend: F,
    resolve_unique_methods: bool,
}

impl<F: SourceFrontend> ProjectBuilder<F> {
    pub fn new(frontend: F) -> Self {
        Self {
            frontend,
            resolve_unique_methods: false,
        }
    }

    pub fn with_unique_methods(mut self, enabled: bool) -> Self {
        self.resolve_unique_methods = enabled;
        self
    }

    fn parse_units(&self, units: &[SourceUnit]) -> (Vec<ParsedUnit>, Vec<SkippedUnit>) {
        let results: Vec<_> = units.par_iter().map(|u| self.frontend.parse(u)).collect();

        let mut parsed = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for result in results {
            match result {
                Ok(unit) => parsed.push(unit),
                Err(e) => {
                    warn!("Skipping {}", e);
                    skipped.push(SkippedUnit {
                        file: e.file().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        // Declaration ids follow this order.
        parsed.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        (parsed, skipped)
    }

    fn declaration(&self, resolver: &ScopeResolver<'_>, func: &ParsedFunction) -> FunctionDeclaration {
        let scope = ResolutionScope {
            crate_name: func.module.first().cloned().unwrap_or_default(),
            module: func.module.clone(),
            self_type: func.self_type.clone(),
            imports: func.imports.clone(),
        };

        let mut decl = FunctionDeclaration::new(FunctionId(0), &func.qualified_name, func.location.clone());
        decl.tags = func.tags.clone();
        decl.call_sites = func
            .calls
            .iter()
            .map(|raw| {
                let target = resolver.resolve(&scope, &raw.target);
                let mut site = CallSite::new(FunctionId(0), target, raw.location.clone());
                site.expression = raw.target.display();
                site.statement_marked = raw.statement_marked;
                site
            })
            .collect();
        decl
    }
}

impl<F: SourceFrontend> ProjectAssembler for ProjectBuilder<F> {
    fn assemble(
        &self,
        name: &str,
        units: &[SourceUnit],
        framework_version: Option<FrameworkVersion>,
    ) -> AnalysisProject {
        let start = Instant::now();
        let (parsed, skipped) = self.parse_units(units);

        let index = SymbolIndex::build(&parsed);
        debug!(
            functions = index.function_count(),
            modules = index.modules.len(),
            "Symbol index built"
        );

        let resolver = ScopeResolver::new(&index).with_unique_methods(self.resolve_unique_methods);
        let functions: Vec<&ParsedFunction> = parsed.iter().flat_map(|u| u.functions.iter()).collect();
        let declarations: Vec<FunctionDeclaration> = functions
            .par_iter()
            .map(|func| self.declaration(&resolver, func))
            .collect();

        let project = AnalysisProject::new(name, declarations, framework_version).with_skipped(skipped);
        info!(
            units = parsed.len(),
            skipped = project.skipped_units.len(),
            functions = project.functions().len(),
            call_sites = project.call_site_count(),
            "Project assembled in {:?}",
            start.elapsed()
        );
        project
    }
}
