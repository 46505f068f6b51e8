//! Rule: form-size
//!
//! Warns when the add or edit form has too many fields (default threshold: 20).

use uitag_core::{FormMode, ParsedUIConfig};

use crate::{LintDiagnostic, LintRule, LintSeverity};

const DEFAULT_MAX_FIELDS: usize = 20;

pub struct FormSizeRule {
    pub max_fields: usize,
}

impl Default for FormSizeRule {
    fn default() -> Self {
        Self {
            max_fields: DEFAULT_MAX_FIELDS,
        }
    }
}

impl LintRule for FormSizeRule {
    fn id(&self) -> &str {
        "form-size"
    }

    fn description(&self) -> &str {
        "Add and edit forms should not have too many fields"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Warning
    }

    fn check(&self, config: &ParsedUIConfig) -> Vec<LintDiagnostic> {
        let mut diagnostics = Vec::new();

        for (mode, what) in [(FormMode::Add, "add"), (FormMode::Edit, "edit")] {
            let count = config.fields_for(mode).len();
            if count > self.max_fields {
                diagnostics.push(self.report(
                    config,
                    None,
                    format!(
                        "The {what} form of \"{}\" has {count} fields (max {}). Consider hiding some with {what}-hidden",
                        config.model, self.max_fields
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

    fn make_model(field_count: usize, extra_tag: &str) -> ParsedUIConfig {
        let rows: Vec<RawTagField> = (0..field_count)
            .map(|i| RawTagField::new(format!("field_{i}"), format!("label:F{i};{extra_tag}")))
            .collect();
        assemble("large", &rows)
    }

    #[test]
    fn detects_large_forms() {
        let results = FormSizeRule::default().check(&make_model(25, ""));
        assert_eq!(results.len(), 2);
        assert!(results[0].message.contains("add form"));
        assert!(results[1].message.contains("edit form"));
    }

    #[test]
    fn only_the_crowded_form_is_reported() {
        let results = FormSizeRule::default().check(&make_model(25, "edit-hidden"));
        assert_eq!(results.len(), 1);
        assert!(results[0].message.contains("add form"));
    }

    #[test]
    fn custom_threshold() {
        let rule = FormSizeRule { max_fields: 3 };
        assert!(rule.check(&make_model(3, "")).is_empty());
        assert_eq!(rule.check(&make_model(4, "")).len(), 2);
    }
}
