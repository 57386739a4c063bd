//! Diagnostics and the append-only sink they are collected in.

use crate::domain::project::SkippedUnit;
use crate::domain::symbol::SourceLocation;
use crate::domain::version::FrameworkVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single finding. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule_id: String,
    pub severity: Severity,
    /// Absent for project-level diagnostics.
    pub location: Option<SourceLocation>,
    pub message: String,
    /// Matched fully-qualified symbol.
    pub symbol: Option<String>,
    /// Orchestrator entry the enclosing function was reached from.
    pub origin: Option<String>,
}

impl Diagnostic {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        location: Option<SourceLocation>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            location,
            message: message.into(),
            symbol: None,
            origin: None,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// Concurrency-safe, append-only collection for one run.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain ordered by `(rule_id, location)`. The sort is stable, so equal
    /// keys keep insertion order.
    pub fn into_sorted(self) -> Vec<Diagnostic> {
        let mut entries = self
            .entries
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        entries.sort_by(|a, b| {
            a.rule_id
                .cmp(&b.rule_id)
                .then_with(|| a.location.cmp(&b.location))
        });
        entries
    }
}

/// Outcome of one run, as handed to exporters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub project: String,
    pub diagnostics: Vec<Diagnostic>,
    pub functions_analyzed: usize,
    pub orchestrator_reachable: usize,
    pub framework_version: Option<FrameworkVersion>,
    pub skipped_units: Vec<SkippedUnit>,
    pub cancelled: bool,
}

impl AnalysisReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn has_findings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity >= Severity::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_concurrent_pushes_are_all_kept() {
        let sink = DiagnosticSink::new();
        (0..200usize).into_par_iter().for_each(|i| {
            sink.push(Diagnostic::new(
                "DF0103",
                Severity::Warning,
                Some(SourceLocation::new("lib.rs", i + 1, 1)),
                "msg",
            ));
        });
        assert_eq!(sink.len(), 200);

        let sorted = sink.into_sorted();
        let lines: Vec<usize> = sorted
            .iter()
            .filter_map(|d| d.location.as_ref().map(|l| l.line))
            .collect();
        let mut expected = lines.clone();
        expected.sort();
        assert_eq!(lines, expected);
    }

    #[test]
    fn test_sorted_by_rule_then_location() {
        let sink = DiagnosticSink::new();
        let at = |line| Some(SourceLocation::new("a.rs", line, 1));
        sink.push(Diagnostic::new("DF0103", Severity::Warning, at(3), "x"));
        sink.push(Diagnostic::new("DF0102", Severity::Warning, at(9), "y"));
        sink.push(Diagnostic::new("DF0103", Severity::Warning, at(1), "z"));

        let ids: Vec<(String, usize)> = sink
            .into_sorted()
            .into_iter()
            .map(|d| (d.rule_id, d.location.map(|l| l.line).unwrap_or(0)))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("DF0102".to_string(), 9),
                ("DF0103".to_string(), 1),
                ("DF0103".to_string(), 3)
            ]
        );
    }
}
