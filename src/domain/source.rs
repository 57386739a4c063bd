// Source units and the front-end's parse output, prior to symbol resolution.

use crate::domain::function::FunctionTag;
use crate::domain::symbol::{CallTarget, ImportScope, SourceLocation};
use crate::domain::version::FrameworkReference;
use std::collections::BTreeSet;
use std::path::{Component, Path};
use std::sync::Arc;

/// One source file of one crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Normalized crate name (`-` replaced by `_`).
    pub crate_name: String,
    pub file_path: String,
    /// Module path inside the crate, without the crate name.
    pub module_path: Vec<String>,
    pub code: String,
}

impl SourceUnit {
    /// Module path is derived from `file_path` (`src/a/b.rs` -> `a::b`).
    pub fn new(crate_name: &str, file_path: impl Into<String>, code: impl Into<String>) -> Self {
        let file_path = file_path.into();
        let module_path = module_path_for(Path::new(&file_path));
        Self {
            crate_name: normalize_crate_name(crate_name),
            file_path,
            module_path,
            code: code.into(),
        }
    }

    pub fn with_module_path(mut self, module_path: Vec<String>) -> Self {
        self.module_path = module_path;
        self
    }

    /// Full module path, starting with the crate name.
    pub fn full_module_path(&self) -> Vec<String> {
        let mut path = vec![self.crate_name.clone()];
        path.extend(self.module_path.iter().cloned());
        path
    }
}

impl From<(String, String, String)> for SourceUnit {
    fn from((crate_name, file_path, code): (String, String, String)) -> Self {
        SourceUnit::new(&crate_name, file_path, code)
    }
}

pub fn normalize_crate_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Module path of a file relative to the nearest `src` directory.
/// `lib.rs`, `main.rs` and `mod.rs` name their parent module.
pub fn module_path_for(path: &Path) -> Vec<String> {
    let components: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    let start = components
        .iter()
        .rposition(|c| c == "src")
        .map(|idx| idx + 1)
        .unwrap_or_else(|| components.len().saturating_sub(1));

    let mut module: Vec<String> = components[start.min(components.len())..].to_vec();
    if let Some(last) = module.pop() {
        let stem = last.strip_suffix(".rs").unwrap_or(&last).to_string();
        let names_parent = stem == "mod" || (module.is_empty() && (stem == "lib" || stem == "main"));
        if !names_parent {
            module.push(stem);
        }
    }
    module
}

/// A call expression found while scanning a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCallSite {
    pub target: CallTarget,
    pub location: SourceLocation,
    pub statement_marked: bool,
}

/// A declaration before its call sites are resolved.
#[derive(Debug, Clone)]
pub struct ParsedFunction {
    pub qualified_name: String,
    /// Full module path including the crate name.
    pub module: Vec<String>,
    pub self_type: Option<String>,
    pub tags: BTreeSet<FunctionTag>,
    pub location: SourceLocation,
    pub imports: Arc<ImportScope>,
    pub calls: Vec<RawCallSite>,
}

/// Everything the front-end extracted from one unit.
#[derive(Debug, Clone, Default)]
pub struct ParsedUnit {
    pub crate_name: String,
    pub file_path: String,
    pub functions: Vec<ParsedFunction>,
    /// Modules whose body lives in this unit, with their imports.
    pub modules: Vec<(Vec<String>, Arc<ImportScope>)>,
    /// `mod name;` declarations pointing at other files.
    pub declared_modules: Vec<Vec<String>>,
    /// Structs, enums, traits and impl targets, as full paths.
    pub types: Vec<Vec<String>>,
}

/// Sources of one project plus the dependency requirements its manifests
/// declare.
#[derive(Debug, Clone, Default)]
pub struct ProjectSources {
    pub name: String,
    pub units: Vec<SourceUnit>,
    pub references: Vec<FrameworkReference>,
}

impl ProjectSources {
    pub fn new(name: impl Into<String>, units: Vec<SourceUnit>) -> Self {
        Self {
            name: name.into(),
            units,
            references: Vec::new(),
        }
    }

    pub fn with_references(mut self, references: Vec<FrameworkReference>) -> Self {
        self.references = references;
        self
    }
}
