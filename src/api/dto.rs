use crate::domain::diagnostic::{AnalysisReport, Diagnostic, Severity};
use crate::domain::project::SkippedUnit;
use crate::domain::rule::{Rule, RuleSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportDto {
    pub project: String,
    pub framework_version: Option<String>,
    pub summary: SummaryDto,
    pub diagnostics: Vec<DiagnosticDto>,
    pub skipped: Vec<SkippedUnit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryDto {
    pub functions_analyzed: usize,
    pub orchestrator_reachable: usize,
    pub warnings: usize,
    pub errors: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticDto {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub symbol: Option<String>,
    pub origin: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RuleDto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub banned: Vec<String>,
    pub version_dependent: bool,
}

impl From<&Diagnostic> for DiagnosticDto {
    fn from(d: &Diagnostic) -> Self {
        DiagnosticDto {
            rule_id: d.rule_id.clone(),
            severity: d.severity,
            message: d.message.clone(),
            file: d.location.as_ref().map(|l| l.file.clone()),
            line: d.location.as_ref().map(|l| l.line),
            column: d.location.as_ref().map(|l| l.column),
            symbol: d.symbol.clone(),
            origin: d.origin.clone(),
        }
    }
}

impl From<&Rule> for RuleDto {
    fn from(rule: &Rule) -> Self {
        RuleDto {
            id: rule.id.clone(),
            title: rule.title.clone(),
            description: rule.description.clone(),
            severity: rule.severity,
            banned: rule.banned_prefixes.clone(),
            version_dependent: rule.requires_version(),
        }
    }
}

impl From<&AnalysisReport> for ReportDto {
    fn from(report: &AnalysisReport) -> Self {
        ReportDto {
            project: report.project.clone(),
            framework_version: report.framework_version.map(|v| v.to_string()),
            summary: SummaryDto {
                functions_analyzed: report.functions_analyzed,
                orchestrator_reachable: report.orchestrator_reachable,
                warnings: report.count(Severity::Warning),
                errors: report.count(Severity::Error),
                cancelled: report.cancelled,
            },
            diagnostics: report.diagnostics.iter().map(DiagnosticDto::from).collect(),
            skipped: report.skipped_units.clone(),
        }
    }
}

pub fn rules_to_dto(rules: &RuleSet) -> Vec<RuleDto> {
    rules.iter().map(RuleDto::from).collect()
}
