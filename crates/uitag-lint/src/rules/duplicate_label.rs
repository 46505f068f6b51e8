//! Rule: duplicate-label
//!
//! Two fields sharing a label are indistinguishable in table headers and
//! form captions.

use std::collections::HashMap;

use uitag_core::ParsedUIConfig;

use crate::{LintDiagnostic, LintRule, LintSeverity};

pub struct DuplicateLabelRule;

impl LintRule for DuplicateLabelRule {
    fn id(&self) -> &str {
        "duplicate-label"
    }

    fn description(&self) -> &str {
        "Detects fields with the same label"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Info
    }

    fn check(&self, config: &ParsedUIConfig) -> Vec<LintDiagnostic> {
        let mut diagnostics = Vec::new();
        let mut seen: HashMap<String, &str> = HashMap::new();

        for (name, field) in &config.fields {
            let Some(label) = field.label.as_deref().map(normalize).filter(|l| !l.is_empty())
            else {
                continue;
            };
            match seen.get(&label) {
                Some(first) => diagnostics.push(self.report(
                    config,
                    Some(name),
                    format!("Field \"{name}\" has the same label as \"{first}\""),
                )),
                None => {
                    seen.insert(label, name);
                }
            }
        }

        diagnostics
    }
}

/// Case and surrounding whitespace do not make labels distinct.
fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uitag_core::{assemble, RawTagField};

    fn check(rows: &[(&str, &str)]) -> Vec<LintDiagnostic> {
        let rows: Vec<RawTagField> = rows.iter().map(|(f, t)| RawTagField::new(*f, *t)).collect();
        DuplicateLabelRule.check(&assemble("sysuser", &rows))
    }

    #[test]
    fn detects_duplicate() {
        let results = check(&[
            ("created_at", "label:时间"),
            ("updated_at", "label:时间"),
            ("name", "label:名称"),
        ]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].field.as_deref(), Some("updated_at"));
        assert!(results[0].message.contains("created_at"));
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(check(&[("a", "label:Name"), ("b", "label: name ")]).len(), 1);
    }

    #[test]
    fn unlabeled_fields_are_skipped() {
        assert!(check(&[("a", "required"), ("b", "required")]).is_empty());
    }
}
