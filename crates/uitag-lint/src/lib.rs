//! UI tag linter: configurable quality rules over assembled configuration.
//!
//! The resolver accepts anything; the validator in `uitag-core` reports what
//! is outright broken. Lint rules cover what works but is probably not what
//! the backend author meant.

mod rules;

pub use rules::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uitag_core::ParsedUIConfig;

/// Severity of a lint finding. Lint findings never block; the levels only
/// drive output and exit codes of callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    Error,
    Warning,
    Info,
}

impl LintSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            LintSeverity::Error => "error",
            LintSeverity::Warning => "warning",
            LintSeverity::Info => "info",
        }
    }
}

/// One finding, located by model and (for field rules) field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintDiagnostic {
    pub rule: String,
    pub severity: LintSeverity,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

pub trait LintRule: Send + Sync {
    /// Identifier used in `lint.rules` of the project config.
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    fn default_severity(&self) -> LintSeverity;

    fn check(&self, config: &ParsedUIConfig) -> Vec<LintDiagnostic>;

    fn report(&self, config: &ParsedUIConfig, field: Option<&str>, message: String) -> LintDiagnostic {
        LintDiagnostic {
            rule: self.id().into(),
            severity: self.default_severity(),
            model: config.model.clone(),
            field: field.map(String::from),
            message,
        }
    }
}

/// Per-rule level in `uitag.config.yaml`:
///
/// ```yaml
/// lint:
///   rules:
///     duplicate-label: error
///     form-size: off
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLevel {
    Off,
    #[default]
    Warn,
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintConfig {
    #[serde(default)]
    pub rules: HashMap<String, RuleLevel>,
}

impl LintConfig {
    pub fn set(mut self, rule_id: &str, level: RuleLevel) -> Self {
        self.rules.insert(rule_id.to_string(), level);
        self
    }

    /// Effective severity of `rule`, `None` when it is switched off. Rules
    /// without an entry keep their own default.
    pub fn level_for(&self, rule: &dyn LintRule) -> Option<LintSeverity> {
        match self.rules.get(rule.id()) {
            Some(RuleLevel::Off) => None,
            Some(RuleLevel::Warn) => Some(LintSeverity::Warning),
            Some(RuleLevel::Error) => Some(LintSeverity::Error),
            None => Some(rule.default_severity()),
        }
    }
}

/// Runs the built-in rules over one assembled model at a time.
pub struct Linter {
    rules: Vec<Box<dyn LintRule>>,
    config: LintConfig,
}

impl Linter {
    pub fn new(config: LintConfig) -> Self {
        Self {
            rules: builtin_rules(),
            config,
        }
    }

    pub fn rules(&self) -> &[Box<dyn LintRule>] {
        &self.rules
    }

    pub fn lint(&self, config: &ParsedUIConfig) -> Vec<LintDiagnostic> {
        self.rules
            .iter()
            .filter_map(|rule| Some((rule, self.config.level_for(rule.as_ref())?)))
            .flat_map(|(rule, severity)| {
                rule.check(config).into_iter().map(move |mut d| {
                    d.severity = severity;
                    d
                })
            })
            .collect()
    }
}

impl Default for Linter {
    fn default() -> Self {
        Self::new(LintConfig::default())
    }
}

fn builtin_rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(CustomButtonPermissionRule),
        Box::new(CustomButtonEndpointRule),
        Box::new(MissingLabelRule),
        Box::new(DuplicateLabelRule),
        Box::new(FormSizeRule::default()),
        Box::new(RelationConfigRule),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use uitag_core::{assemble, RawTagField};

    fn unmapped_export() -> ParsedUIConfig {
        assemble(
            "sysuser",
            &[
                RawTagField::new("UIConfig", "actions:custom:Export;action-api:Export=/export"),
                RawTagField::new("name", "label:Name"),
            ],
        )
    }

    #[test]
    fn well_formed_model_is_clean() {
        let config = assemble(
            "sysuser",
            &[
                RawTagField::new(
                    "UIConfig",
                    "actions:view,custom:Audit;action-permission:Audit=sysuser:audit;action-api:Audit=/sysuser/audit",
                ),
                RawTagField::new("username", "label:用户名"),
                RawTagField::new("depts", "label:部门;path:depts;path-item:name"),
            ],
        );
        let result = Linter::default().lint(&config);
        assert!(result.is_empty(), "{result:?}");
        assert!(Linter::default().lint(&ParsedUIConfig::default()).is_empty());
    }

    #[test]
    fn unconfigured_rules_keep_default_severity() {
        let levels = LintConfig::default();
        assert_eq!(levels.level_for(&DuplicateLabelRule), Some(LintSeverity::Info));
        assert_eq!(levels.level_for(&MissingLabelRule), Some(LintSeverity::Warning));

        let levels = levels.set("duplicate-label", RuleLevel::Warn);
        assert_eq!(levels.level_for(&DuplicateLabelRule), Some(LintSeverity::Warning));
    }

    #[test]
    fn configured_level_overrides_findings() {
        let config = unmapped_export();

        let result = Linter::new(LintConfig::default().set("custom-button-permission", RuleLevel::Error))
            .lint(&config);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].rule, "custom-button-permission");
        assert_eq!(result[0].severity, LintSeverity::Error);

        let off = LintConfig::default().set("custom-button-permission", RuleLevel::Off);
        assert_eq!(off.level_for(&CustomButtonPermissionRule), None);
        assert!(Linter::new(off).lint(&config).is_empty());
    }

    #[test]
    fn levels_deserialize_from_lowercase_words() {
        let levels: LintConfig =
            serde_json::from_str(r#"{"rules": {"form-size": "off", "missing-label": "error"}}"#).unwrap();
        assert_eq!(levels.rules["form-size"], RuleLevel::Off);
        assert_eq!(levels.rules["missing-label"], RuleLevel::Error);
    }
}
