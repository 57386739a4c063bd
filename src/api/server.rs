use crate::api::dto::{rules_to_dto, ReportDto};
use crate::application::{AnalysisEngine, AnalyzeUsecase, CancellationToken};
use crate::config::Config;
use crate::domain::source::ProjectSources;
use crate::infrastructure::{ProjectBuilder, ProjectLoader, SynFrontend};
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

#[derive(Debug, Deserialize)]
struct CommandReq {
    command: String,
    params: Option<serde_json::Value>,
}

/// Line-delimited JSON server: one request object per line, one response
/// object per line. Commands: PING, RULES, ANALYZE {path}, SHUTDOWN.
pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
}

struct ServerState {
    /// Used for every request instead of per-project discovery when set.
    config: Option<Config>,
    shutdown: AtomicBool,
    address: SocketAddr,
}

impl Server {
    /// Port 0 picks a free port; see `local_addr`.
    pub fn bind(port: u16, config: Option<Config>) -> Result<Self> {
        let address = format!("127.0.0.1:{}", port);
        let listener = TcpListener::bind(&address).with_context(|| format!("Failed to bind to {}", address))?;
        let address = listener.local_addr()?;
        Ok(Self {
            listener,
            state: Arc::new(ServerState {
                config,
                shutdown: AtomicBool::new(false),
                address,
            }),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.state.address
    }

    /// Accept connections until a SHUTDOWN command is received.
    pub fn serve(self) -> Result<()> {
        info!("API server listening on {}", self.state.address);

        for stream in self.listener.incoming() {
            if self.state.shutdown.load(Ordering::SeqCst) {
                break;
            }
            match stream {
                Ok(stream) => {
                    let state = self.state.clone();
                    thread::spawn(move || {
                        if let Err(e) = handle_connection(stream, &state) {
                            warn!("Connection error: {:#}", e);
                        }
                    });
                }
                Err(e) => error!("Accept error: {}", e),
            }
        }

        info!("API server stopped");
        Ok(())
    }
}

pub fn start_server(port: u16, config: Option<Config>) -> Result<()> {
    Server::bind(port, config)?.serve()
}

fn handle_connection(mut stream: TcpStream, state: &ServerState) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (response, shutdown) = match process_command(trimmed, state) {
            Ok((data, shutdown)) => (json!({ "status": "success", "data": data }), shutdown),
            Err(e) => (json!({ "status": "error", "message": format!("{:#}", e) }), false),
        };

        stream.write_all(serde_json::to_string(&response)?.as_bytes())?;
        stream.write_all(b"\n")?;

        if shutdown {
            info!("Shutdown requested");
            state.shutdown.store(true, Ordering::SeqCst);
            // Wake the accept loop so it observes the flag.
            let _ = TcpStream::connect(state.address);
            break;
        }
    }
    Ok(())
}

fn process_command(json_str: &str, state: &ServerState) -> Result<(serde_json::Value, bool)> {
    let req: CommandReq = serde_json::from_str(json_str).context("Invalid JSON format")?;
    debug!(command = %req.command, "Request");

    match req.command.as_str() {
        "PING" => Ok((json!("PONG"), false)),
        "RULES" => {
            let config = state.config.clone().unwrap_or_default();
            Ok((serde_json::to_value(rules_to_dto(&config.rule_set()?))?, false))
        }
        "ANALYZE" => Ok((handle_analyze(req.params, state)?, false)),
        "SHUTDOWN" => Ok((json!("Shutting down..."), true)),
        _ => bail!("Unknown command: {}", req.command),
    }
}

fn handle_analyze(params: Option<serde_json::Value>, state: &ServerState) -> Result<serde_json::Value> {
    let params = params.ok_or_else(|| anyhow!("Missing params for ANALYZE"))?;
    let path_str = params
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Missing 'path' param"))?;

    let path = PathBuf::from(path_str);
    if !path.exists() {
        bail!("Path not found: {}", path_str);
    }
    info!("Analyzing {}", path_str);

    let (sources, project_dir) = load_sources(&path)?;
    let config = match &state.config {
        Some(config) => config.clone(),
        None => Config::load(&project_dir),
    };

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

    let report = usecase.run(&sources, &CancellationToken::new());
    Ok(serde_json::to_value(ReportDto::from(&report))?)
}

/// A Cargo.toml path or a directory holding one is loaded as a workspace;
/// any other directory is scanned as a plain folder.
fn load_sources(path: &Path) -> Result<(ProjectSources, PathBuf)> {
    let manifest = if path.is_file() && path.file_name().map_or(false, |n| n == "Cargo.toml") {
        Some(path.to_path_buf())
    } else if path.join("Cargo.toml").is_file() {
        Some(path.join("Cargo.toml"))
    } else {
        None
    };

    match manifest {
        Some(manifest) => {
            let dir = manifest.parent().map(Path::to_path_buf).unwrap_or_default();
            Ok((ProjectLoader::load_workspace(&manifest.to_string_lossy())?, dir))
        }
        None => Ok((ProjectLoader::load_folder(&path.to_string_lossy())?, path.to_path_buf())),
    }
}
