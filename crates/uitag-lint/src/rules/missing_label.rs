//! Rule: missing-label
//!
//! Fields shown in the table or a form without a `label` fall back to the
//! raw field name as their caption.

use uitag_core::{FormMode, ParsedUIConfig};

use crate::{LintDiagnostic, LintRule, LintSeverity};

const CONTEXTS: [FormMode; 4] = [FormMode::Table, FormMode::Add, FormMode::Edit, FormMode::Detail];

pub struct MissingLabelRule;

impl LintRule for MissingLabelRule {
    fn id(&self) -> &str {
        "missing-label"
    }

    fn description(&self) -> &str {
        "Visible fields should have a label"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Warning
    }

    fn check(&self, config: &ParsedUIConfig) -> Vec<LintDiagnostic> {
        let mut diagnostics = Vec::new();

        for (name, field) in &config.fields {
            let unlabeled = field.label.as_deref().map_or(true, |l| l.trim().is_empty());
            if unlabeled && CONTEXTS.iter().any(|m| field.is_visible(*m)) {
                diagnostics.push(self.report(
                    config,
                    Some(name),
                    format!("Field \"{name}\" has no label; its name is shown instead"),
                ));
            }
        }

        diagnostics
    }
}
