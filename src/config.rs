//! Configuration loading from durable-lint.toml and Cargo.toml metadata.
//!
//! Search order:
//! 1. `durable-lint.toml` in the analyzed directory
//! 2. `[package.metadata.durable-lint]` in its `Cargo.toml`
//! 3. `durable-lint.toml` in any parent directory
//! 4. Defaults
//!
//! ## Example
//!
//! ```toml
//! [analysis]
//! entry-attributes = ["durable_execution"]
//! marker-comment = "durable-lint: deterministic"
//!
//! [framework]
//! crates = ["aws-durable-execution-sdk"]
//! current-since = "1.0.0"
//!
//! [[rules.custom]]
//! id = "DF0900"
//! title = "Random numbers are not allowed in orchestrator functions"
//! banned = ["rand::random"]
//! ```

use crate::domain::rule::{MessageTemplate, Rule, RuleSet, DETERMINISTIC_MESSAGE};
use crate::domain::version::{FrameworkVersion, VersionResolver};
use anyhow::{bail, Context, Result};
use cargo_metadata::semver::Version;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_FILE_NAME: &str = "durable-lint.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// File this config was read from (for display).
    #[serde(skip)]
    pub source: Option<PathBuf>,
    pub analysis: AnalysisSettings,
    pub framework: FrameworkSettings,
    pub rules: RuleSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AnalysisSettings {
    /// Function or parameter attributes marking an orchestration entry.
    pub entry_attributes: Vec<String>,
    /// Parameter types (last path segment) marking an orchestration entry.
    pub entry_context_types: Vec<String>,
    /// Attributes exempting a function or statement.
    pub marker_attributes: Vec<String>,
    /// Comment directive exempting the next (or same) line.
    pub marker_comment: String,
    /// Resolve `x.method()` when exactly one project method has that name.
    pub resolve_unique_methods: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            entry_attributes: vec![
                "durable_execution".to_string(),
                "orchestrator".to_string(),
                "orchestration_trigger".to_string(),
            ],
            entry_context_types: vec!["DurableContext".to_string()],
            marker_attributes: vec!["deterministic".to_string()],
            marker_comment: "durable-lint: deterministic".to_string(),
            resolve_unique_methods: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FrameworkSettings {
    pub crates: Vec<String>,
    /// First version of the framework treated as current (V2).
    pub current_since: String,
    /// Skip resolution and use this version (`v1` or `v2`).
    pub version: Option<String>,
}

impl Default for FrameworkSettings {
    fn default() -> Self {
        Self {
            crates: vec!["aws-durable-execution-sdk".to_string()],
            current_since: "1.0.0".to_string(),
            version: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RuleSettings {
    pub disabled: Vec<String>,
    pub report_undetermined_version: bool,
    pub custom: Vec<CustomRule>,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            report_undetermined_version: true,
            custom: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CustomRule {
    pub id: String,
    pub title: String,
    pub banned: Vec<String>,
    pub message: Option<String>,
    pub legacy_message: Option<String>,
    pub current_message: Option<String>,
}

impl CustomRule {
    fn to_rule(&self) -> Result<Rule> {
        if self.banned.is_empty() {
            bail!("custom rule {} bans nothing", self.id);
        }
        let message = match (&self.legacy_message, &self.current_message) {
            (Some(legacy), Some(current)) => MessageTemplate::Versioned {
                legacy: legacy.clone(),
                current: current.clone(),
            },
            (None, None) => MessageTemplate::Uniform(
                self.message
                    .clone()
                    .unwrap_or_else(|| DETERMINISTIC_MESSAGE.to_string()),
            ),
            _ => bail!(
                "custom rule {} must set both legacy-message and current-message",
                self.id
            ),
        };
        Ok(Rule::new(&self.id, &self.title, &self.banned, message))
    }
}

/// Wrapper for Cargo.toml structure.
#[derive(Debug, Deserialize)]
struct CargoManifest {
    package: Option<CargoPackage>,
}

#[derive(Debug, Deserialize)]
struct CargoPackage {
    metadata: Option<CargoMetadataTable>,
}

#[derive(Debug, Deserialize)]
struct CargoMetadataTable {
    #[serde(rename = "durable-lint")]
    durable_lint: Option<toml::Value>,
}

impl Config {
    /// Discover configuration for `directory`. Broken discovered files are
    /// reported and ignored.
    pub fn load(directory: &Path) -> Self {
        let local = directory.join(CONFIG_FILE_NAME);
        if local.exists() {
            match Self::from_path(&local) {
                Ok(config) => return config,
                Err(e) => warn!("Ignoring {}: {:#}", local.display(), e),
            }
        }

        let manifest = directory.join("Cargo.toml");
        if manifest.exists() {
            match Self::from_cargo_manifest(&manifest) {
                Ok(Some(config)) => return config,
                Ok(None) => {}
                Err(e) => warn!("Ignoring metadata in {}: {:#}", manifest.display(), e),
            }
        }

        let mut current = directory.to_path_buf();
        while let Some(parent) = current.parent() {
            let candidate = parent.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                match Self::from_path(&candidate) {
                    Ok(config) => return config,
                    Err(e) => warn!("Ignoring {}: {:#}", candidate.display(), e),
                }
            }
            current = parent.to_path_buf();
        }

        debug!("No configuration found for {}", directory.display());
        Self::default()
    }

    /// Load an explicitly requested file; errors are fatal.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn from_cargo_manifest(path: &Path) -> Result<Option<Self>> {
        let content = std::fs::read_to_string(path)?;
        let manifest: CargoManifest = toml::from_str(&content)?;
        let Some(table) = manifest
            .package
            .and_then(|p| p.metadata)
            .and_then(|m| m.durable_lint)
        else {
            return Ok(None);
        };
        let mut config: Config = table.try_into()?;
        config.validate()?;
        config.source = Some(path.to_path_buf());
        Ok(Some(config))
    }

    fn validate(&self) -> Result<()> {
        Version::parse(&self.framework.current_since).with_context(|| {
            format!(
                "framework.current-since '{}' is not a semver version",
                self.framework.current_since
            )
        })?;
        if let Some(label) = &self.framework.version {
            label.parse::<FrameworkVersion>()?;
        }
        for custom in &self.rules.custom {
            custom.to_rule()?;
        }
        Ok(())
    }

    pub fn rule_set(&self) -> Result<RuleSet> {
        let mut rules = RuleSet::builtin();
        for custom in &self.rules.custom {
            rules.register(custom.to_rule()?);
        }
        rules.disable(&self.rules.disabled);
        Ok(rules)
    }

    pub fn version_resolver(&self) -> Result<VersionResolver> {
        let current_since = Version::parse(&self.framework.current_since)?;
        let pinned = self
            .framework
            .version
            .as_deref()
            .map(str::parse::<FrameworkVersion>)
            .transpose()?;
        Ok(VersionResolver::new(self.framework.crates.clone(), current_since).pinned(pinned))
    }

    /// Format config for verbose display.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();
        match &self.source {
            Some(source) => lines.push(format!("   Config: {}", source.display())),
            None => lines.push("   Config: (defaults)".to_string()),
        }
        lines.push(format!(
            "   Entry attributes: {}",
            self.analysis.entry_attributes.join(", ")
        ));
        lines.push(format!("   Framework crates: {}", self.framework.crates.join(", ")));
        if let Some(version) = &self.framework.version {
            lines.push(format!("   Framework version: {} (pinned)", version));
        }
        if !self.rules.disabled.is_empty() {
            lines.push(format!("   Disabled rules: {}", self.rules.disabled.join(", ")));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{GUID_RULE_ID, TIMER_RULE_ID};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config
            .analysis
            .entry_attributes
            .contains(&"durable_execution".to_string()));
        assert!(config.rules.report_undetermined_version);
        assert_eq!(config.rule_set().unwrap().len(), 2);
    }

    #[test]
    fn test_custom_rules_and_disabled() {
        let config = Config::from_toml_str(
            r#"
[rules]
disabled = ["DF0103"]

[[rules.custom]]
id = "DF0900"
title = "Random numbers"
banned = ["rand::random"]
"#,
        )
        .unwrap();
        let rules = config.rule_set().unwrap();
        assert!(rules.get(GUID_RULE_ID).is_some());
        assert!(rules.get(TIMER_RULE_ID).is_none());
        assert_eq!(rules.get("DF0900").unwrap().banned_prefixes, vec!["rand::random"]);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_toml_str("[framework]\ncurrent-since = \"soon\"").is_err());
        assert!(Config::from_toml_str("[framework]\nversion = \"v9\"").is_err());
        assert!(Config::from_toml_str(
            "[[rules.custom]]\nid = \"X\"\ntitle = \"t\"\nbanned = []"
        )
        .is_err());
    }

    #[test]
    fn test_load_prefers_local_file_then_cargo_metadata() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            r#"
[package]
name = "app"
version = "0.1.0"

[package.metadata.durable-lint.framework]
version = "v1"
"#,
        )
        .unwrap();
        let from_manifest = Config::load(dir.path());
        assert_eq!(from_manifest.framework.version.as_deref(), Some("v1"));

        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[framework]\nversion = \"v2\"\n",
        )
        .unwrap();
        let from_file = Config::load(dir.path());
        assert_eq!(from_file.framework.version.as_deref(), Some("v2"));
        assert_eq!(
            from_file.version_resolver().unwrap().resolve(&[]),
            Some(FrameworkVersion::V2)
        );
    }

    #[test]
    fn test_broken_discovered_config_falls_back() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "not = [valid").unwrap();
        let config = Config::load(dir.path());
        assert!(config.source.is_none());
        assert_eq!(config.rule_set().unwrap().len(), 2);
    }
}
