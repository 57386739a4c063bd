// Infrastructure implementations for Durable Lint.

pub mod concurrency;
pub mod dot_exporter;
pub mod exporters;
pub mod index;
pub mod markers;
pub mod project_builder;
pub mod project_loader;
pub mod resolver;
pub mod syn_frontend;

pub use dot_exporter::CallGraphDotExporter;
pub use exporters::{JsonExporter, SarifExporter, TextExporter};
pub use index::SymbolIndex;
pub use project_builder::ProjectBuilder;
pub use project_loader::ProjectLoader;
pub use resolver::ScopeResolver;
pub use syn_frontend::SynFrontend;
