use std::path::Path;

use uitag_lint::{LintDiagnostic, LintSeverity, Linter};

use crate::{build_configs, project_config, to_json};

pub fn run_lint(input_path: &Path, format: &str) -> Result<String, String> {
    let configs = build_configs(input_path)?;
    let linter = Linter::new(project_config(input_path).lint);

    let results: Vec<(&str, LintDiagnostic)> = configs
        .iter()
        .flat_map(|(file, config)| {
            linter
                .lint(config)
                .into_iter()
                .map(move |d| (file.path.as_str(), d))
        })
        .collect();
    let file_count = configs.len();

    match format {
        "json" => {
            let diagnostics: Vec<&LintDiagnostic> = results.iter().map(|(_, d)| d).collect();
            to_json(&serde_json::json!({
                "diagnostics": diagnostics,
                "summary": {
                    "count": results.len(),
                    "files": file_count,
                }
            }))
        }
        "sarif" => {
            let sarif = build_sarif(&results, &linter);
            serde_json::to_string_pretty(&sarif)
                .map_err(|e| format!("SARIF serialization error: {e}"))
        }
        _ => {
            // Human-readable format
            let mut lines: Vec<String> = Vec::new();

            for (path, d) in &results {
                let severity = d.severity.as_str();
                let target = match &d.field {
                    Some(field) => format!("{}.{field}", d.model),
                    None => d.model.clone(),
                };
                lines.push(format!(
                    "{path}: {severity}[{}] {target}: {}",
                    d.rule, d.message
                ));
            }

            let count = results.len();
            let issue_word = if count == 1 { "issue" } else { "issues" };
            let file_word = if file_count == 1 { "file" } else { "files" };
            lines.push(format!(
                "{count} lint {issue_word} in {file_count} {file_word}."
            ));

            Ok(lines.join("\n"))
        }
    }
}

fn sarif_level(severity: LintSeverity) -> &'static str {
    match severity {
        LintSeverity::Error => "error",
        LintSeverity::Warning => "warning",
        LintSeverity::Info => "note",
    }
}

fn build_sarif(results: &[(&str, LintDiagnostic)], linter: &Linter) -> serde_json::Value {
    let rule_descriptors: Vec<serde_json::Value> = linter
        .rules()
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.id(),
                "shortDescription": { "text": r.description() },
                "defaultConfiguration": { "level": sarif_level(r.default_severity()) }
            })
        })
        .collect();

    let sarif_results: Vec<serde_json::Value> = results
        .iter()
        .map(|(path, d)| {
            let logical = match &d.field {
                Some(field) => format!("{}.{field}", d.model),
                None => d.model.clone(),
            };
            serde_json::json!({
                "ruleId": d.rule,
                "level": sarif_level(d.severity),
                "message": { "text": d.message },
                "locations": [{
                    "physicalLocation": {
                        "artifactLocation": { "uri": path }
                    },
                    "logicalLocations": [{ "fullyQualifiedName": logical }]
                }]
            })
        })
        .collect();

    serde_json::json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/main/sarif-2.1/schema/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "uitag-lint",
                    "version": env!("CARGO_PKG_VERSION"),
                    "rules": rule_descriptors
                }
            },
            "results": sarif_results
        }]
    })
}
