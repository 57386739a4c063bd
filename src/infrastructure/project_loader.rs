use crate::domain::source::{module_path_for, ProjectSources, SourceUnit};
use crate::domain::version::FrameworkReference;
use anyhow::{Context, Result};
use cargo_metadata::MetadataCommand;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct ProjectLoader;

/// The parts of a Cargo.toml the folder loader reads.
#[derive(Debug, Default, Deserialize)]
struct Manifest {
    package: Option<ManifestPackage>,
    #[serde(default)]
    dependencies: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Deserialize)]
struct ManifestPackage {
    name: String,
}

impl ProjectLoader {
    /// Load all source files of a Cargo workspace, with the dependency
    /// requirements every member declares.
    pub fn load_workspace(manifest_path: &str) -> Result<ProjectSources> {
        let metadata = MetadataCommand::new()
            .manifest_path(manifest_path)
            .no_deps()
            .exec()
            .context("Failed to execute cargo metadata")?;

        let mut units = Vec::new();
        let mut references = Vec::new();

        for package_id in &metadata.workspace_members {
            let Some(package) = metadata.packages.iter().find(|p| &p.id == package_id) else {
                continue;
            };

            for dep in &package.dependencies {
                references.push(FrameworkReference::new(
                    package.name.as_str(),
                    dep.name.as_str(),
                    dep.req.to_string(),
                ));
            }

            for target in &package.targets {
                // Library and binary code only; tests, benches and build
                // scripts are not orchestrator code.
                if !target.kind.iter().any(|k| k == "lib" || k == "bin" || k == "proc-macro") {
                    continue;
                }
                let src_path = target.src_path.as_std_path();
                let src_dir = src_path.parent().unwrap_or(src_path);
                Self::collect_rs_recursive(src_dir, src_dir, &package.name, &mut units)?;
            }
        }

        // Targets sharing a source directory list the same files.
        units.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        units.dedup_by(|a, b| a.file_path == b.file_path);

        let name = metadata
            .workspace_root
            .file_name()
            .unwrap_or("workspace")
            .to_string();
        info!(
            members = metadata.workspace_members.len(),
            files = units.len(),
            "Loaded workspace {}",
            name
        );
        Ok(ProjectSources::new(name, units).with_references(references))
    }

    /// Load every `.rs` file under `dir`. The crate name and dependency
    /// requirements come from the nearest Cargo.toml, if any.
    pub fn load_folder(dir: &str) -> Result<ProjectSources> {
        let root = Path::new(dir);
        let manifest_dir = find_manifest_dir(root);
        let manifest = match &manifest_dir {
            Some(dir) => read_manifest(&dir.join("Cargo.toml"))?,
            None => Manifest::default(),
        };

        let crate_name = manifest
            .package
            .as_ref()
            .map(|p| p.name.clone())
            .or_else(|| {
                root.file_name()
                    .map(|n| n.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "crate".to_string());

        // A crate root is read from its `src/`, leaving tests, benches,
        // examples and build scripts out as `load_workspace` does.
        let is_crate_root = manifest_dir.is_some() && root.canonicalize().ok() == manifest_dir;
        let source_root = if is_crate_root && root.join("src").is_dir() {
            root.join("src")
        } else {
            root.to_path_buf()
        };

        let mut units = Vec::new();
        Self::collect_rs_recursive(&source_root, &source_root, &crate_name, &mut units)?;
        units.sort_by(|a, b| a.file_path.cmp(&b.file_path));

        let references = manifest
            .dependencies
            .iter()
            .filter_map(|(dep, entry)| {
                requirement_of(entry).map(|req| FrameworkReference::new(crate_name.as_str(), dep.as_str(), req))
            })
            .collect();

        debug!(files = units.len(), "Loaded folder {}", root.display());
        Ok(ProjectSources::new(crate_name, units).with_references(references))
    }

    /// Load explicitly named files as modules of one crate.
    pub fn load_files(crate_name: &str, paths: &[String]) -> Result<ProjectSources> {
        let mut units = Vec::new();
        for path in paths {
            let code = fs::read_to_string(path).with_context(|| format!("Failed to read file {}", path))?;
            units.push(SourceUnit::new(crate_name, path.as_str(), code));
        }
        Ok(ProjectSources::new(crate_name, units))
    }

    fn collect_rs_recursive(
        root: &Path,
        dir: &Path,
        crate_name: &str,
        out: &mut Vec<SourceUnit>,
    ) -> Result<()> {
        if dir.ends_with("target") || dir.ends_with(".git") || !dir.exists() {
            return Ok(());
        }

        if dir.is_file() {
            if dir.extension().map_or(false, |ext| ext == "rs") {
                out.push(Self::read_unit(root, dir, crate_name)?);
            }
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_rs_recursive(root, &path, crate_name, out)?;
            } else if path.extension().map_or(false, |ext| ext == "rs") {
                out.push(Self::read_unit(root, &path, crate_name)?);
            }
        }
        Ok(())
    }

    /// Module paths are taken relative to the source root, so a file at
    /// `<root>/orders/steps.rs` is module `orders::steps`.
    fn read_unit(root: &Path, path: &Path, crate_name: &str) -> Result<SourceUnit> {
        let code = fs::read_to_string(path).with_context(|| format!("Failed to read file {}", path.display()))?;
        let relative = path.strip_prefix(root).unwrap_or(path);
        let module_path = module_path_for(&Path::new("src").join(relative));
        Ok(SourceUnit::new(crate_name, path.display().to_string(), code).with_module_path(module_path))
    }
}

fn find_manifest_dir(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .find(|dir| dir.join("Cargo.toml").is_file())
        .map(Path::to_path_buf)
}

fn read_manifest(path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid manifest {}", path.display()))
}

/// `dep = "1.2"`, `dep = { version = "1.2" }`; workspace-inherited
/// requirements are reported as `workspace` and stay unclassifiable.
fn requirement_of(entry: &toml::Value) -> Option<String> {
    match entry {
        toml::Value::String(req) => Some(req.clone()),
        toml::Value::Table(table) => {
            if let Some(req) = table.get("version").and_then(|v| v.as_str()) {
                Some(req.to_string())
            } else if table.get("workspace").and_then(|v| v.as_bool()) == Some(true) {
                Some("workspace".to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}
