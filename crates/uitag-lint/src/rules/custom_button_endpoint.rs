//! Rule: custom-button-endpoint
//!
//! A custom button with neither `action-api` nor `action-callback` does
//! nothing when clicked.

use uitag_core::ParsedUIConfig;

use crate::{LintDiagnostic, LintRule, LintSeverity};

pub struct CustomButtonEndpointRule;

impl LintRule for CustomButtonEndpointRule {
    fn id(&self) -> &str {
        "custom-button-endpoint"
    }

    fn description(&self) -> &str {
        "Custom buttons should declare an action-api or an action-callback"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Info
    }

    fn check(&self, config: &ParsedUIConfig) -> Vec<LintDiagnostic> {
        let global = &config.global;
        let has = |map: &Option<uitag_core::ActionMap>, key: &str| {
            map.as_ref()
                .and_then(|m| m.get(key))
                .is_some_and(|v| !v.trim().is_empty())
        };

        let mut diagnostics = Vec::new();
        for button in config.buttons().iter().filter(|b| b.is_custom()) {
            let name = button.bare_name();
            if !has(&global.action_api, name) && !has(&global.action_callback, name) {
                diagnostics.push(self.report(
                    config,
                    None,
                    format!("Button \"{button}\" has no action-api or action-callback"),
                ));
            }
        }
        diagnostics
    }
}
