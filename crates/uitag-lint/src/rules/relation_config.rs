//! Rule: relation-config
//!
//! `path-item` is ignored without `path`, and a `mode` without `path`
//! renders the whole row.

use uitag_core::ParsedUIConfig;

use crate::{LintDiagnostic, LintRule, LintSeverity};

pub struct RelationConfigRule;

impl LintRule for RelationConfigRule {
    fn id(&self) -> &str {
        "relation-config"
    }

    fn description(&self) -> &str {
        "Relation display settings need a path"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Warning
    }

    fn check(&self, config: &ParsedUIConfig) -> Vec<LintDiagnostic> {
        let mut diagnostics = Vec::new();

        for (name, field) in &config.fields {
            if field.path.as_deref().is_some_and(|p| !p.is_empty()) {
                continue;
            }
            let orphaned: Vec<&str> = [
                ("path-item", field.path_item.is_some()),
                ("mode", field.mode.is_some()),
            ]
            .into_iter()
            .filter_map(|(attr, set)| set.then_some(attr))
            .collect();

            if !orphaned.is_empty() {
                diagnostics.push(self.report(
                    config,
                    Some(name),
                    format!(
                        "Field \"{name}\" sets {} without path",
                        orphaned.join(" and ")
                    ),
                ));
            }
        }

        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uitag_core::{assemble, RawTagField};

    fn check(tag: &str) -> Vec<LintDiagnostic> {
        RelationConfigRule.check(&assemble("sysuser", &[RawTagField::new("depts", tag)]))
    }

    #[test]
    fn detects_orphaned_settings() {
        let results = check("label:部门;path-item:name;mode:tags");
        assert_eq!(results.len(), 1);
        assert!(results[0].message.contains("path-item and mode"));
    }

    #[test]
    fn mode_alone_is_reported() {
        let results = check("mode:count");
        assert_eq!(results.len(), 1);
        assert!(results[0].message.contains("sets mode without path"));
    }

    #[test]
    fn complete_relation_is_fine() {
        assert!(check("path:depts;path-item:name;mode:tags").is_empty());
    }

    #[test]
    fn plain_field_is_fine() {
        assert!(check("label:部门").is_empty());
    }
}
