//! Rule: custom-button-permission
//!
//! Custom buttons have no default permission. Without an
//! `action-permission` entry they are denied for every user.

use uitag_core::ParsedUIConfig;

use crate::{LintDiagnostic, LintRule, LintSeverity};

pub struct CustomButtonPermissionRule;

impl LintRule for CustomButtonPermissionRule {
    fn id(&self) -> &str {
        "custom-button-permission"
    }

    fn description(&self) -> &str {
        "Custom buttons need an action-permission entry or nobody sees them"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Warning
    }

    fn check(&self, config: &ParsedUIConfig) -> Vec<LintDiagnostic> {
        let mapped = config.global.action_permission.as_ref();

        config
            .buttons()
            .iter()
            .filter(|b| b.is_custom())
            .filter(|b| !mapped.is_some_and(|m| m.contains_key(b.bare_name())))
            .map(|b| {
                self.report(
                    config,
                    None,
                    format!(
                        "Button \"{b}\" has no action-permission entry and is hidden from every user"
                    ),
                )
            })
            .collect()
    }
}
