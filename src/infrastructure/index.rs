use crate::domain::source::ParsedUnit;
use crate::domain::symbol::ImportScope;
use dashmap::{DashMap, DashSet};
use rayon::prelude::*;
use std::sync::Arc;

/// Thread-safe index of everything declared in the analyzed crates.
/// Filled in parallel from parsed units, then read by the resolver.
#[derive(Default)]
pub struct SymbolIndex {
    // Key: crate::module::[Type::]func -> number of declarations
    pub functions: DashMap<String, usize>,

    // Key: crate::module -> its `use` declarations
    pub modules: DashMap<String, Arc<ImportScope>>,

    // crate::module::Type for structs, enums, traits and impl targets
    pub types: DashSet<String>,

    // Acceleration map: MethodName -> qualified names of methods
    pub method_lookup: DashMap<String, Vec<String>>,

    pub crates: DashSet<String>,
}

impl SymbolIndex {
    pub fn build(units: &[ParsedUnit]) -> Self {
        let index = SymbolIndex::default();

        units.par_iter().for_each(|unit| {
            index.crates.insert(unit.crate_name.clone());

            for (path, imports) in &unit.modules {
                // A file's own scope replaces the empty placeholder a
                // `mod name;` declaration may have inserted.
                index.modules.insert(path.join("::"), imports.clone());
            }
            for path in &unit.declared_modules {
                index
                    .modules
                    .entry(path.join("::"))
                    .or_insert_with(|| Arc::new(ImportScope::default()));
            }
            for path in &unit.types {
                index.types.insert(path.join("::"));
            }

            for func in &unit.functions {
                *index
                    .functions
                    .entry(func.qualified_name.clone())
                    .or_insert(0) += 1;
                if func.self_type.is_some() {
                    let method = func
                        .qualified_name
                        .rsplit("::")
                        .next()
                        .unwrap_or(&func.qualified_name)
                        .to_string();
                    index
                        .method_lookup
                        .entry(method)
                        .or_default()
                        .push(func.qualified_name.clone());
                }
            }
        });

        index
    }

    pub fn has_function(&self, qualified_name: &str) -> bool {
        self.functions.contains_key(qualified_name)
    }

    pub fn has_module(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }

    pub fn has_type(&self, path: &str) -> bool {
        self.types.contains(path)
    }

    /// Module, type or function declared at `path`.
    pub fn has_item(&self, path: &str) -> bool {
        self.has_module(path) || self.has_type(path) || self.has_function(path)
    }

    pub fn is_project_crate(&self, name: &str) -> bool {
        self.crates.contains(name)
    }

    /// Returns a clone to avoid holding DashMap locks.
    pub fn module_imports(&self, path: &str) -> Option<Arc<ImportScope>> {
        self.modules.get(path).map(|entry| entry.value().clone())
    }

    /// All methods with a given name, sorted for stable output.
    pub fn find_methods_by_name(&self, method_name: &str) -> Vec<String> {
        let mut candidates = self
            .method_lookup
            .get(method_name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        candidates.sort();
        candidates.dedup();
        candidates
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::SourceUnit;
    use crate::infrastructure::syn_frontend::SynFrontend;
    use crate::ports::SourceFrontend;

    fn units() -> Vec<ParsedUnit> {
        let frontend = SynFrontend::default();
        vec![
            SourceUnit::new("app", "src/lib.rs", "mod steps;\nstruct Svc;\nimpl Svc { fn run(&self) {} }\nfn main() {}"),
            SourceUnit::new("app", "src/steps.rs", "use uuid::Uuid;\npub fn run() {}"),
            SourceUnit::new("helpers", "src/lib.rs", "pub struct Clock;\nimpl Clock { pub fn run(&self) {} }"),
        ]
        .iter()
        .map(|u| frontend.parse(u).unwrap())
        .collect()
    }

    #[test]
    fn test_build_indexes_all_units() {
        let index = SymbolIndex::build(&units());
        assert_eq!(index.function_count(), 4);
        assert!(index.has_function("app::Svc::run"));
        assert!(index.has_function("app::steps::run"));
        assert!(index.has_module("app::steps"));
        assert!(index.has_type("helpers::Clock"));
        assert!(index.is_project_crate("helpers"));
        assert!(!index.is_project_crate("uuid"));
    }

    #[test]
    fn test_file_scope_wins_over_declaration() {
        let index = SymbolIndex::build(&units());
        let scope = index.module_imports("app::steps").unwrap();
        assert!(scope.alias("Uuid").is_some());
    }

    #[test]
    fn test_find_methods_by_name_only_lists_methods() {
        let index = SymbolIndex::build(&units());
        assert_eq!(
            index.find_methods_by_name("run"),
            vec!["app::Svc::run".to_string(), "helpers::Clock::run".to_string()]
        );
        assert!(index.find_methods_by_name("main").is_empty());
    }
}
