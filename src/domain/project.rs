use crate::domain::function::{FunctionDeclaration, FunctionId};
use crate::domain::version::FrameworkVersion;
use serde::{Deserialize, Serialize};

/// A source file the front-end could not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedUnit {
    pub file: String,
    pub reason: String,
}

/// Immutable snapshot of everything one analysis run looks at.
#[derive(Debug, Clone, Default)]
pub struct AnalysisProject {
    pub name: String,
    functions: Vec<FunctionDeclaration>,
    pub framework_version: Option<FrameworkVersion>,
    pub skipped_units: Vec<SkippedUnit>,
}

impl AnalysisProject {
    /// Declarations are renumbered so that `functions[i].id == FunctionId(i)`;
    /// call sites are re-pointed at their enclosing declaration.
    pub fn new(
        name: impl Into<String>,
        mut functions: Vec<FunctionDeclaration>,
        framework_version: Option<FrameworkVersion>,
    ) -> Self {
        for (idx, func) in functions.iter_mut().enumerate() {
            func.id = FunctionId(idx);
            for site in &mut func.call_sites {
                site.enclosing = FunctionId(idx);
            }
        }
        Self {
            name: name.into(),
            functions,
            framework_version,
            skipped_units: Vec::new(),
        }
    }

    pub fn with_skipped(mut self, skipped: Vec<SkippedUnit>) -> Self {
        self.skipped_units = skipped;
        self
    }

    pub fn functions(&self) -> &[FunctionDeclaration] {
        &self.functions
    }

    pub fn function(&self, id: FunctionId) -> Option<&FunctionDeclaration> {
        self.functions.get(id.0)
    }

    pub fn find(&self, qualified_name: &str) -> Option<&FunctionDeclaration> {
        self.functions
            .iter()
            .find(|f| f.qualified_name == qualified_name)
    }

    pub fn entry_points(&self) -> impl Iterator<Item = &FunctionDeclaration> {
        self.functions.iter().filter(|f| f.is_orchestration_entry())
    }

    pub fn call_site_count(&self) -> usize {
        self.functions.iter().map(|f| f.call_sites.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::function::{CallSite, FunctionTag};
    use crate::domain::symbol::{Resolution, SourceLocation};

    #[test]
    fn test_new_renumbers_declarations() {
        let loc = SourceLocation::new("lib.rs", 1, 1);
        let mut f = FunctionDeclaration::new(FunctionId(7), "app::a", loc.clone())
            .with_tag(FunctionTag::OrchestrationEntry);
        f.call_sites
            .push(CallSite::new(FunctionId(7), Resolution::resolved("app::b"), loc.clone()));
        let g = FunctionDeclaration::new(FunctionId(3), "app::b", loc);

        let project = AnalysisProject::new("app", vec![f, g], None);
        assert_eq!(project.functions()[0].id, FunctionId(0));
        assert_eq!(project.functions()[0].call_sites[0].enclosing, FunctionId(0));
        assert_eq!(project.find("app::b").map(|f| f.id), Some(FunctionId(1)));
        assert_eq!(project.entry_points().count(), 1);
    }
}
