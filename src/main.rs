// Command-line entry point for Durable Lint.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use durable_lint::api::start_server;
use durable_lint::application::{AnalysisEngine, AnalyzeUsecase, CancellationToken};
use durable_lint::config::Config;
use durable_lint::domain::callgraph::CallGraph;
use durable_lint::domain::source::ProjectSources;
use durable_lint::domain::FrameworkVersion;
use durable_lint::infrastructure::concurrency::init_thread_pool;
use durable_lint::infrastructure::{
    CallGraphDotExporter, JsonExporter, ProjectBuilder, ProjectLoader, SarifExporter, SynFrontend,
    TextExporter,
};
use durable_lint::ports::DiagnosticExporter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Sarif,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input source file path (can specify multiple)
    #[arg(short, long)]
    input: Vec<String>,

    /// Input source folder(s)
    #[arg(short = 'd', long)]
    folder: Vec<String>,

    /// Workspace Cargo.toml
    #[arg(long)]
    workspace: Option<String>,

    /// Crate name for files given with --input
    #[arg(long, default_value = "main")]
    crate_name: String,

    /// Configuration file (default: discovered durable-lint.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Framework version to assume (v1 or v2), skipping manifest detection
    #[arg(long)]
    framework_version: Option<String>,

    /// Worker threads
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Write the call graph as DOT to this path
    #[arg(long)]
    emit_callgraph: Option<String>,

    /// Exit with status 1 when any warning is reported
    #[arg(long)]
    deny_warnings: bool,

    /// Run the JSON API server on this port instead of analyzing
    #[arg(long)]
    serve: Option<u16>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// The directory configuration is discovered from.
fn project_dir(cli: &Cli) -> PathBuf {
    if let Some(manifest) = &cli.workspace {
        return Path::new(manifest)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
    }
    if let Some(folder) = cli.folder.first() {
        return PathBuf::from(folder);
    }
    cli.input
        .first()
        .and_then(|f| Path::new(f).parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load(&project_dir(cli)),
    };
    if let Some(version) = &cli.framework_version {
        version
            .parse::<FrameworkVersion>()
            .context("Invalid --framework-version")?;
        config.framework.version = Some(version.clone());
    }
    Ok(config)
}

fn load_sources(cli: &Cli) -> Result<ProjectSources> {
    let mut parts = Vec::new();
    if let Some(manifest) = &cli.workspace {
        parts.push(ProjectLoader::load_workspace(manifest)?);
    }
    for folder in &cli.folder {
        parts.push(ProjectLoader::load_folder(folder)?);
    }
    if !cli.input.is_empty() {
        parts.push(ProjectLoader::load_files(&cli.crate_name, &cli.input)?);
    }
    if parts.is_empty() {
        bail!("Please provide at least one --input <file>, --folder <dir> or --workspace <Cargo.toml>");
    }

    let mut merged = ProjectSources::new(parts[0].name.clone(), Vec::new());
    for part in parts {
        merged.units.extend(part.units);
        merged.references.extend(part.references);
    }
    merged.units.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    merged.units.dedup_by(|a, b| a.file_path == b.file_path);
    Ok(merged)
}

fn run(cli: &Cli) -> Result<bool> {
    let config = load_config(cli)?;
    if cli.verbose > 0 {
        eprintln!("{}", config.display_summary());
    }

    if let Some(port) = cli.serve {
        let explicit = cli.config.as_ref().map(|_| config.clone());
        start_server(port, explicit)?;
        return Ok(false);
    }

    let sources = load_sources(cli)?;
    info!("Collected {} source files for '{}'", sources.units.len(), sources.name);

    let assembler = ProjectBuilder::new(SynFrontend::new(config.analysis.clone()))
        .with_unique_methods(config.analysis.resolve_unique_methods);
    let versions = config.version_resolver()?;
    let engine = AnalysisEngine::new(config.rule_set()?)
        .with_undetermined_version_report(config.rules.report_undetermined_version);

    let usecase = AnalyzeUsecase {
        assembler: &assembler,
        versions: &versions,
        engine: &engine,
    };
    let (project, report) = usecase.run_project(&sources, &CancellationToken::new());

    if let Some(dot_path) = &cli.emit_callgraph {
        let graph = CallGraph::build(project.functions());
        CallGraphDotExporter::export(&project, &graph, dot_path)
            .with_context(|| format!("Failed to write call graph to {}", dot_path))?;
        info!("Call graph written to {}", dot_path);
    }

    let exporter: &dyn DiagnosticExporter = match cli.format {
        OutputFormat::Text => &TextExporter,
        OutputFormat::Json => &JsonExporter,
        OutputFormat::Sarif => &SarifExporter,
    };
    match &cli.output {
        Some(path) => {
            exporter
                .export(&report, engine.rules(), path)
                .with_context(|| format!("Failed to write report to {}", path))?;
            info!("Report written to {}", path);
        }
        None => print!("{}", exporter.render(&report, engine.rules())?),
    }

    if !report.skipped_units.is_empty() {
        warn!("{} file(s) could not be parsed", report.skipped_units.len());
    }
    Ok(report.has_findings())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = init_thread_pool(cli.jobs) {
        warn!("Thread pool setup failed: {}", e);
    }

    match run(&cli) {
        Ok(has_findings) if has_findings && cli.deny_warnings => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
