//! Framework Version Resolution
//!
//! Picks the runtime generation an analyzed project targets from the version
//! requirements it declares on the durable framework crate.

use crate::domain::error::VersionLabelError;
use crate::domain::rule::RuleVariant;
use cargo_metadata::semver::{Op, Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FrameworkVersion {
    V1,
    V2,
}

impl FrameworkVersion {
    pub fn rule_variant(self) -> RuleVariant {
        match self {
            FrameworkVersion::V1 => RuleVariant::Legacy,
            FrameworkVersion::V2 => RuleVariant::Current,
        }
    }
}

impl fmt::Display for FrameworkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameworkVersion::V1 => write!(f, "v1"),
            FrameworkVersion::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for FrameworkVersion {
    type Err = VersionLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "v1" | "1" | "legacy" => Ok(FrameworkVersion::V1),
            "v2" | "2" | "current" => Ok(FrameworkVersion::V2),
            other => Err(VersionLabelError(other.to_string())),
        }
    }
}

/// Maps the run's version to the message variant rules should use.
pub fn select_variant(version: Option<FrameworkVersion>) -> Option<RuleVariant> {
    version.map(FrameworkVersion::rule_variant)
}

/// A declared dependency, as read from a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkReference {
    /// Package declaring the dependency.
    pub package: String,
    /// Dependency name, e.g. `aws-durable-execution-sdk`.
    pub dependency: String,
    /// Requirement string, e.g. `^1.2`.
    pub requirement: String,
}

impl FrameworkReference {
    pub fn new(
        package: impl Into<String>,
        dependency: impl Into<String>,
        requirement: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            dependency: dependency.into(),
            requirement: requirement.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VersionResolver {
    crates: Vec<String>,
    current_since: Version,
    pinned: Option<FrameworkVersion>,
}

impl Default for VersionResolver {
    fn default() -> Self {
        Self::new(vec!["aws-durable-execution-sdk".to_string()], Version::new(1, 0, 0))
    }
}

impl VersionResolver {
    pub fn new(crates: Vec<String>, current_since: Version) -> Self {
        Self {
            crates,
            current_since,
            pinned: None,
        }
    }

    /// A pinned version wins over whatever the manifests declare.
    pub fn pinned(mut self, version: Option<FrameworkVersion>) -> Self {
        self.pinned = version;
        self
    }

    /// Exactly one version or none: references that cannot be classified or
    /// that disagree leave the version undetermined.
    pub fn resolve(&self, references: &[FrameworkReference]) -> Option<FrameworkVersion> {
        if let Some(version) = self.pinned {
            return Some(version);
        }

        let relevant: Vec<&FrameworkReference> = references
            .iter()
            .filter(|r| self.crates.iter().any(|c| same_crate(c, &r.dependency)))
            .collect();
        if relevant.is_empty() {
            debug!("No framework reference found");
            return None;
        }

        let mut seen: BTreeSet<Option<FrameworkVersion>> = BTreeSet::new();
        for reference in &relevant {
            let classified = self.classify(&reference.requirement);
            if classified.is_none() {
                warn!(
                    "Cannot classify '{}' requirement '{}' in package {}",
                    reference.dependency, reference.requirement, reference.package
                );
            }
            seen.insert(classified);
        }

        match seen.into_iter().collect::<Vec<_>>().as_slice() {
            [Some(version)] => Some(*version),
            other => {
                warn!(candidates = ?other, "Framework version is ambiguous");
                None
            }
        }
    }

    /// Legacy when the lowest version admitted by `requirement` is below
    /// `current_since`.
    pub fn classify(&self, requirement: &str) -> Option<FrameworkVersion> {
        let req = VersionReq::parse(requirement.trim()).ok()?;
        let lower = lower_bound(&req)?;
        if lower < self.current_since {
            Some(FrameworkVersion::V1)
        } else {
            Some(FrameworkVersion::V2)
        }
    }
}

/// `None` for `*`, where nothing bounds the version from below.
fn lower_bound(req: &VersionReq) -> Option<Version> {
    let mut bound: Option<Version> = None;
    for comparator in &req.comparators {
        let candidate = match comparator.op {
            Op::Less | Op::LessEq => Version::new(0, 0, 0),
            _ => Version::new(
                comparator.major,
                comparator.minor.unwrap_or(0),
                comparator.patch.unwrap_or(0),
            ),
        };
        bound = match bound {
            Some(current) if current >= candidate => Some(current),
            _ => Some(candidate),
        };
    }
    bound
}

fn same_crate(a: &str, b: &str) -> bool {
    a.replace('_', "-") == b.replace('_', "-")
}
