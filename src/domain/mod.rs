// Domain model for Durable Lint: declarations, call graph, rules, diagnostics.

pub mod callgraph;
pub mod context;
pub mod diagnostic;
pub mod error;
pub mod function;
pub mod project;
pub mod rule;
pub mod source;
pub mod symbol;
pub mod version;

pub use callgraph::{CallGraph, CallGraphNode, Reachability};
pub use context::ContextClassifier;
pub use diagnostic::{AnalysisReport, Diagnostic, DiagnosticSink, Severity};
pub use error::FrontendError;
pub use function::{CallSite, FunctionDeclaration, FunctionId, FunctionTag};
pub use project::{AnalysisProject, SkippedUnit};
pub use rule::{MessageTemplate, Rule, RuleSet, RuleVariant};
pub use source::{ParsedFunction, ParsedUnit, ProjectSources, RawCallSite, SourceUnit};
pub use symbol::{CallTarget, ImportScope, Resolution, ResolutionScope, SourceLocation};
pub use version::{FrameworkReference, FrameworkVersion, VersionResolver};
