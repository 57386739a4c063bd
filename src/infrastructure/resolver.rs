//! Scope-based symbol resolution.
//!
//! Turns a call expression into a fully-qualified path using the module it
//! appears in, that module's `use` declarations and the project-wide symbol
//! index. Anything that cannot be pinned down to one path without type
//! information is `Unresolved`.

use crate::domain::symbol::{CallTarget, Resolution, ResolutionScope};
use crate::infrastructure::index::SymbolIndex;
use crate::ports::SymbolResolver;

/// Re-export chains longer than this are given up on.
const MAX_REEXPORT_DEPTH: usize = 8;

pub struct ScopeResolver<'i> {
    index: &'i SymbolIndex,
    resolve_unique_methods: bool,
}

impl<'i> ScopeResolver<'i> {
    pub fn new(index: &'i SymbolIndex) -> Self {
        Self {
            index,
            resolve_unique_methods: false,
        }
    }

    /// Resolve `x.method()` when exactly one project method has that name.
    pub fn with_unique_methods(mut self, enabled: bool) -> Self {
        self.resolve_unique_methods = enabled;
        self
    }

    fn resolve_method(&self, scope: &ResolutionScope, receiver_is_self: bool, method: &str) -> Resolution {
        if receiver_is_self {
            if let Some(ty) = &scope.self_type {
                let candidate = join(&scope.module, &[ty.as_str(), method]);
                if self.index.has_function(&candidate) {
                    return Resolution::Resolved(candidate);
                }
            }
        }
        if self.resolve_unique_methods {
            if let [only] = self.index.find_methods_by_name(method).as_slice() {
                return Resolution::Resolved(only.clone());
            }
        }
        Resolution::Unresolved
    }

    fn resolve_path(&self, scope: &ResolutionScope, segments: &[String], absolute: bool) -> Resolution {
        if segments.is_empty() {
            return Resolution::Unresolved;
        }
        if absolute {
            return self.finish(segments.to_vec());
        }
        match self.expand(scope, segments) {
            Some(path) => self.finish(path),
            None => Resolution::Unresolved,
        }
    }

    /// Rewrites a path as written into an absolute one.
    fn expand(&self, scope: &ResolutionScope, segments: &[String]) -> Option<Vec<String>> {
        let head = segments[0].as_str();
        let rest = &segments[1..];

        match head {
            "crate" | "self" | "super" => Some(self.absolutize(scope, segments)),
            "Self" => {
                let ty = scope.self_type.as_ref()?;
                let mut path = scope.module.clone();
                path.push(ty.clone());
                path.extend_from_slice(rest);
                Some(path)
            }
            _ => {
                if let Some(target) = scope.imports.alias(head) {
                    let mut path = self.absolutize(scope, target);
                    path.extend_from_slice(rest);
                    return Some(path);
                }
                if rest.is_empty() {
                    self.expand_name(scope, head)
                } else {
                    self.expand_qualified(scope, segments)
                }
            }
        }
    }

    /// A bare `name(..)` call.
    fn expand_name(&self, scope: &ResolutionScope, name: &str) -> Option<Vec<String>> {
        let local = with(&scope.module, name);
        if self.index.has_function(&local.join("::")) {
            return Some(local);
        }

        let candidates: Vec<Vec<String>> = scope
            .imports
            .globs
            .iter()
            .map(|glob| with(&self.absolutize(scope, glob), name))
            .collect();

        let known: Vec<&Vec<String>> = candidates
            .iter()
            .filter(|c| self.index.has_function(&c.join("::")))
            .collect();
        match (known.as_slice(), candidates.as_slice()) {
            ([only], _) => Some((*only).clone()),
            ([], [only]) => Some(only.clone()),
            _ => None,
        }
    }

    /// `head::..::name(..)` where `head` is neither imported nor a keyword.
    fn expand_qualified(&self, scope: &ResolutionScope, segments: &[String]) -> Option<Vec<String>> {
        let head = segments[0].as_str();
        let local = with(&scope.module, head);
        if self.index.has_item(&local.join("::")) {
            let mut path = scope.module.clone();
            path.extend_from_slice(segments);
            return Some(path);
        }

        for glob in &scope.imports.globs {
            let base = self.absolutize(scope, glob);
            if self.index.has_item(&with(&base, head).join("::")) {
                let mut path = base;
                path.extend_from_slice(segments);
                return Some(path);
            }
        }

        // Lower-case heads name crates or modules; upper-case heads name
        // types, which only a single glob can have brought into scope.
        if head.chars().next().map_or(false, char::is_lowercase) {
            return Some(segments.to_vec());
        }
        match scope.imports.globs.as_slice() {
            [glob] => {
                let mut path = self.absolutize(scope, glob);
                path.extend_from_slice(segments);
                Some(path)
            }
            _ => None,
        }
    }

    /// Absolutizes a path relative to the scope's module: `crate`, `self`
    /// and `super` are rewritten, and a head naming a child item of the
    /// module makes the path module-relative.
    fn absolutize(&self, scope: &ResolutionScope, path: &[String]) -> Vec<String> {
        let Some(head) = path.first() else {
            return Vec::new();
        };
        match head.as_str() {
            "crate" => {
                let mut out = vec![scope.crate_name.clone()];
                out.extend_from_slice(&path[1..]);
                out
            }
            "self" => {
                let mut out = scope.module.clone();
                out.extend_from_slice(&path[1..]);
                out
            }
            "super" => {
                let supers = path.iter().take_while(|s| *s == "super").count();
                let keep = scope.module.len().saturating_sub(supers).max(1);
                let mut out = scope.module[..keep].to_vec();
                out.extend_from_slice(&path[supers..]);
                out
            }
            _ => {
                if self.index.has_item(&with(&scope.module, head).join("::")) {
                    let mut out = scope.module.clone();
                    out.extend_from_slice(path);
                    out
                } else {
                    path.to_vec()
                }
            }
        }
    }

    fn finish(&self, path: Vec<String>) -> Resolution {
        let qualified = path.join("::");
        if self.index.has_function(&qualified) {
            return Resolution::Resolved(qualified);
        }
        if self.in_project(&path) {
            if let Some(target) = self.chase_reexport(&path, 0) {
                return Resolution::Resolved(target.join("::"));
            }
        }
        Resolution::Resolved(qualified)
    }

    fn in_project(&self, path: &[String]) -> bool {
        path.first()
            .map_or(false, |krate| self.index.is_project_crate(krate))
    }

    /// Follows `pub use` chains inside the project. Stops at a declared
    /// function, at a path that leaves the project crates, or at the last
    /// module that re-exports the next segment.
    fn chase_reexport(&self, path: &[String], depth: usize) -> Option<Vec<String>> {
        if depth >= MAX_REEXPORT_DEPTH {
            return None;
        }
        for split in (1..path.len()).rev() {
            let module = &path[..split];
            let Some(imports) = self.index.module_imports(&module.join("::")) else {
                continue;
            };
            let Some(target) = imports.alias(&path[split]) else {
                continue;
            };
            let scope = ResolutionScope {
                crate_name: module[0].clone(),
                module: module.to_vec(),
                self_type: None,
                imports: imports.clone(),
            };
            let mut next = self.absolutize(&scope, target);
            next.extend_from_slice(&path[split + 1..]);
            if next.as_slice() == path {
                return None;
            }
            if self.index.has_function(&next.join("::")) || !self.in_project(&next) {
                return Some(next);
            }
            return self.chase_reexport(&next, depth + 1).or(Some(next));
        }
        None
    }
}

impl SymbolResolver for ScopeResolver<'_> {
    fn resolve(&self, scope: &ResolutionScope, target: &CallTarget) -> Resolution {
        match target {
            CallTarget::Path { segments, absolute } => self.resolve_path(scope, segments, *absolute),
            CallTarget::Method {
                receiver_is_self,
                method,
            } => self.resolve_method(scope, *receiver_is_self, method),
        }
    }
}

fn with(base: &[String], name: &str) -> Vec<String> {
    let mut out = base.to_vec();
    out.push(name.to_string());
    out
}

fn join(base: &[String], extra: &[&str]) -> String {
    let mut parts: Vec<&str> = base.iter().map(String::as_str).collect();
    parts.extend_from_slice(extra);
    parts.join("::")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::{ParsedFunction, ParsedUnit, SourceUnit};
    use crate::infrastructure::syn_frontend::SynFrontend;
    use crate::ports::SourceFrontend;

    fn parse_all(files: &[(&str, &str, &str)]) -> Vec<ParsedUnit> {
        let frontend = SynFrontend::default();
        files
            .iter()
            .map(|(krate, path, code)| frontend.parse(&SourceUnit::new(krate, *path, *code)).unwrap())
            .collect()
    }

    /// Resolved call targets of `function`, in source order.
    fn resolve_calls(units: &[ParsedUnit], function: &str) -> Vec<Option<String>> {
        let index = SymbolIndex::build(units);
        let resolver = ScopeResolver::new(&index);
        let func: &ParsedFunction = units
            .iter()
            .flat_map(|u| u.functions.iter())
            .find(|f| f.qualified_name == function)
            .unwrap();
        let scope = ResolutionScope {
            crate_name: func.module[0].clone(),
            module: func.module.clone(),
            self_type: func.self_type.clone(),
            imports: func.imports.clone(),
        };
        func.calls
            .iter()
            .map(|c| resolver.resolve(&scope, &c.target).qualified_name().map(str::to_string))
            .collect()
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_imports_and_aliases() {
        let units = parse_all(&[(
            "app",
            "src/lib.rs",
            r#"
use uuid::Uuid;
use std::thread;
use tokio::time::sleep as pause;
fn run() {
    Uuid::new_v4();
    thread::sleep(d);
    pause(d);
    std::thread::sleep(d);
    ::uuid::Uuid::now_v7();
}
"#,
        )]);
        assert_eq!(
            resolve_calls(&units, "app::run"),
            vec![
                some("uuid::Uuid::new_v4"),
                some("std::thread::sleep"),
                some("tokio::time::sleep"),
                some("std::thread::sleep"),
                some("uuid::Uuid::now_v7"),
            ]
        );
    }

    #[test]
    fn test_project_functions_shadow_external_names() {
        let units = parse_all(&[
            (
                "app",
                "src/lib.rs",
                r#"
mod util;
mod uuid {
    pub struct Uuid;
    impl Uuid { pub fn new_v4() -> Self { Uuid } }
}
fn sleep() {}
fn run() {
    sleep();
    uuid::Uuid::new_v4();
    util::helper();
    crate::util::helper();
}
"#,
            ),
            ("app", "src/util.rs", "pub fn helper() { super::sleep(); }"),
        ]);
        assert_eq!(
            resolve_calls(&units, "app::run"),
            vec![
                some("app::sleep"),
                some("app::uuid::Uuid::new_v4"),
                some("app::util::helper"),
                some("app::util::helper"),
            ]
        );
        assert_eq!(resolve_calls(&units, "app::util::helper"), vec![some("app::sleep")]);
    }

    #[test]
    fn test_globs() {
        let units = parse_all(&[(
            "app",
            "src/lib.rs",
            r#"
mod one {
    use tokio::time::*;
    fn run() { sleep(d); Instant::now(); }
}
mod two {
    use tokio::time::*;
    use async_std::task::*;
    fn run() { sleep(d); }
}
"#,
        )]);
        assert_eq!(
            resolve_calls(&units, "app::one::run"),
            vec![some("tokio::time::sleep"), some("tokio::time::Instant::now")]
        );
        assert_eq!(resolve_calls(&units, "app::two::run"), vec![None]);
    }

    #[test]
    fn test_self_methods_and_unknown_receivers() {
        let units = parse_all(&[(
            "app",
            "src/lib.rs",
            r#"
struct Flow;
impl Flow {
    fn run(&self, other: Other) {
        self.step();
        Self::step_static();
        other.step();
        self.missing();
    }
    fn step(&self) {}
    fn step_static() {}
}
"#,
        )]);
        assert_eq!(
            resolve_calls(&units, "app::Flow::run"),
            vec![some("app::Flow::step"), some("app::Flow::step_static"), None, None]
        );
    }

    #[test]
    fn test_unique_method_resolution_is_opt_in() {
        let units = parse_all(&[(
            "app",
            "src/lib.rs",
            "struct A;\nimpl A { fn only(&self) {} }\nfn run(a: A) { a.only(); }",
        )]);
        let index = SymbolIndex::build(&units);
        let target = CallTarget::Method {
            receiver_is_self: false,
            method: "only".to_string(),
        };
        let scope = ResolutionScope::root("app");
        assert_eq!(ScopeResolver::new(&index).resolve(&scope, &target), Resolution::Unresolved);
        assert_eq!(
            ScopeResolver::new(&index)
                .with_unique_methods(true)
                .resolve(&scope, &target),
            Resolution::resolved("app::A::only")
        );
    }

    #[test]
    fn test_reexports_are_followed_across_crates() {
        let units = parse_all(&[
            ("helpers", "src/lib.rs", "mod inner;\npub use inner::wait_a_bit;"),
            ("helpers", "src/inner.rs", "pub fn wait_a_bit() { std::thread::sleep(d); }"),
            (
                "app",
                "src/lib.rs",
                "use helpers::wait_a_bit;\nfn run() { wait_a_bit(); helpers::wait_a_bit(); }",
            ),
        ]);
        assert_eq!(
            resolve_calls(&units, "app::run"),
            vec![some("helpers::inner::wait_a_bit"), some("helpers::inner::wait_a_bit")]
        );
    }

    #[test]
    fn test_reexports_of_external_items() {
        let units = parse_all(&[
            (
                "app",
                "src/lib.rs",
                "mod prelude;\nmod util;\nuse crate::prelude::Uuid;\nfn run() { Uuid::new_v4(); util::thread::sleep(d); }",
            ),
            ("app", "src/prelude.rs", "pub use uuid::Uuid;"),
            ("app", "src/util.rs", "pub use std::thread;"),
        ]);
        assert_eq!(
            resolve_calls(&units, "app::run"),
            vec![some("uuid::Uuid::new_v4"), some("std::thread::sleep")]
        );
    }

    #[test]
    fn test_unimported_type_paths_are_unresolved() {
        let units = parse_all(&[("app", "src/lib.rs", "fn run() { Uuid::new_v4(); }")]);
        assert_eq!(resolve_calls(&units, "app::run"), vec![None]);
    }
}
