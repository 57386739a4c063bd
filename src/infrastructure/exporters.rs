//! Diagnostic exporters: rustc-style text, JSON, and SARIF 2.1.0.

use crate::api::dto::ReportDto;
use crate::domain::diagnostic::{AnalysisReport, Diagnostic, Severity};
use crate::domain::rule::RuleSet;
use crate::ports::DiagnosticExporter;
use anyhow::Result;
use serde::Serialize;

pub struct TextExporter;

impl TextExporter {
    fn render_diagnostic(d: &Diagnostic) -> String {
        let mut out = format!("{}[{}]: {}\n", d.severity, d.rule_id, d.message);
        if let Some(location) = &d.location {
            out.push_str(&format!("  --> {}\n", location));
        }
        if let Some(origin) = &d.origin {
            out.push_str(&format!("  = note: reachable from orchestrator '{}'\n", origin));
        }
        out
    }
}

impl DiagnosticExporter for TextExporter {
    fn render(&self, report: &AnalysisReport, _rules: &RuleSet) -> Result<String> {
        let mut out = String::new();
        for d in &report.diagnostics {
            out.push_str(&Self::render_diagnostic(d));
            out.push('\n');
        }
        for skipped in &report.skipped_units {
            out.push_str(&format!("note: skipped {}: {}\n", skipped.file, skipped.reason));
        }
        if report.cancelled {
            out.push_str("note: analysis was cancelled; results are partial\n");
        }

        let warnings = report.count(Severity::Warning);
        let errors = report.count(Severity::Error);
        out.push_str(&format!(
            "{}: {} warning(s), {} error(s) in {} function(s), {} reachable from orchestrators\n",
            report.project, warnings, errors, report.functions_analyzed, report.orchestrator_reachable
        ));
        Ok(out)
    }
}

pub struct JsonExporter;

impl DiagnosticExporter for JsonExporter {
    fn render(&self, report: &AnalysisReport, _rules: &RuleSet) -> Result<String> {
        Ok(serde_json::to_string_pretty(&ReportDto::from(report))?)
    }
}

pub struct SarifExporter;

const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";

#[derive(Debug, Serialize)]
struct SarifLog {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Debug, Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifDriver {
    name: &'static str,
    version: &'static str,
    rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: String,
    short_description: SarifMessage,
    full_description: SarifMessage,
    default_configuration: SarifConfiguration,
}

#[derive(Debug, Serialize)]
struct SarifConfiguration {
    level: &'static str,
}

#[derive(Debug, Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    level: &'static str,
    message: SarifMessage,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    locations: Vec<SarifLocation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: SarifArtifactLocation,
    region: SarifRegion,
}

#[derive(Debug, Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRegion {
    start_line: usize,
    start_column: usize,
}

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "note",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

impl DiagnosticExporter for SarifExporter {
    fn render(&self, report: &AnalysisReport, rules: &RuleSet) -> Result<String> {
        let rules = rules
            .iter()
            .map(|rule| SarifRule {
                id: rule.id.clone(),
                short_description: SarifMessage {
                    text: rule.title.clone(),
                },
                full_description: SarifMessage {
                    text: rule.description.clone(),
                },
                default_configuration: SarifConfiguration {
                    level: sarif_level(rule.severity),
                },
            })
            .collect();

        let results = report
            .diagnostics
            .iter()
            .map(|d| SarifResult {
                rule_id: d.rule_id.clone(),
                level: sarif_level(d.severity),
                message: SarifMessage {
                    text: d.message.clone(),
                },
                locations: d
                    .location
                    .iter()
                    .map(|l| SarifLocation {
                        physical_location: SarifPhysicalLocation {
                            artifact_location: SarifArtifactLocation {
                                uri: l.file.replace('\\', "/"),
                            },
                            region: SarifRegion {
                                start_line: l.line,
                                start_column: l.column,
                            },
                        },
                    })
                    .collect(),
            })
            .collect();

        let log = SarifLog {
            schema: SARIF_SCHEMA,
            version: "2.1.0",
            runs: vec![SarifRun {
                tool: SarifTool {
                    driver: SarifDriver {
                        name: env!("CARGO_PKG_NAME"),
                        version: env!("CARGO_PKG_VERSION"),
                        rules,
                    },
                },
                results,
            }],
        };
        Ok(serde_json::to_string_pretty(&log)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::symbol::SourceLocation;

    fn report() -> AnalysisReport {
        AnalysisReport {
            project: "app".to_string(),
            diagnostics: vec![
                Diagnostic::new("DF0001", Severity::Info, None, "version unknown"),
                Diagnostic::new(
                    "DF0102",
                    Severity::Warning,
                    Some(SourceLocation::new("src/lib.rs", 4, 14)),
                    "'uuid::Uuid::new_v4' violates the orchestrator deterministic code constraint.",
                )
                .with_symbol("uuid::Uuid::new_v4")
                .with_origin("app::flow"),
            ],
            functions_analyzed: 3,
            orchestrator_reachable: 2,
            ..AnalysisReport::default()
        }
    }

    #[test]
    fn test_text_output() {
        let text = TextExporter.render(&report(), &RuleSet::builtin()).unwrap();
        assert!(text.contains("warning[DF0102]: 'uuid::Uuid::new_v4' violates"));
        assert!(text.contains("  --> src/lib.rs:4:14"));
        assert!(text.contains("reachable from orchestrator 'app::flow'"));
        assert!(text.contains("info[DF0001]: version unknown"));
        assert!(text.contains("1 warning(s), 0 error(s) in 3 function(s)"));
    }

    #[test]
    fn test_json_output() {
        let json = JsonExporter.render(&report(), &RuleSet::builtin()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["warnings"], 1);
        assert_eq!(value["diagnostics"][1]["line"], 4);
        assert_eq!(value["diagnostics"][1]["severity"], "warning");
        assert!(value["diagnostics"][0]["file"].is_null());
    }

    #[test]
    fn test_sarif_output() {
        let sarif = SarifExporter.render(&report(), &RuleSet::builtin()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&sarif).unwrap();
        assert_eq!(value["version"], "2.1.0");
        let run = &value["runs"][0];
        assert_eq!(run["tool"]["driver"]["rules"].as_array().unwrap().len(), 2);
        assert_eq!(run["results"][0]["level"], "note");
        assert!(run["results"][0].get("locations").is_none());
        let region = &run["results"][1]["locations"][0]["physicalLocation"]["region"];
        assert_eq!(region["startLine"], 4);
        assert_eq!(region["startColumn"], 14);
    }
}
