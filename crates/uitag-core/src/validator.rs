use std::collections::HashSet;

use crate::catalogs::{
    BUILTIN_BUTTONS, FIELD_ATTRIBUTE_INDEX, GLOBAL_ATTRIBUTE_INDEX, UI_CONFIG_FIELD,
};
use crate::expression::{template_body, Expr};
use crate::formatter::{FormatterKind, FormatterSpec};
use crate::parser::parse_tag;
use crate::types::*;

/// Check an assembled configuration for problems the resolver tolerates
/// silently.
pub fn validate(config: &ParsedUIConfig) -> ValidateResult {
    let mut errors: Vec<Diagnostic> = Vec::new();
    let mut warnings: Vec<Diagnostic> = Vec::new();
    let model = config.model.as_str();
    let global = &config.global;

    let declared: HashSet<&str> = config.buttons().iter().map(ButtonId::bare_name).collect();

    // UIT-E001: action setting for a button that is not declared
    for (attr, map) in action_maps(global) {
        for key in map.keys() {
            if !declared.contains(key.as_str()) {
                errors.push(diag(
                    "UIT-E001",
                    DiagnosticSeverity::Error,
                    model,
                    None,
                    format!("{attr} has an entry for \"{key}\", which is not listed in actions"),
                ));
            }
        }
    }

    // UIT-W007: unknown non-custom button token
    for button in config.buttons() {
        if !button.is_custom() && !BUILTIN_BUTTONS.contains(&button.as_str()) {
            warnings.push(diag(
                "UIT-W007",
                DiagnosticSeverity::Warning,
                model,
                None,
                format!(
                    "Button \"{button}\" is neither built-in nor prefixed with \"custom:\""
                ),
            ));
        }
    }

    // UIT-E002: condition does not compile; UIT-W008: reads names other than `row`
    if let Some(conditions) = &global.action_item_condition {
        for (button, condition) in conditions {
            let src = template_body(condition.trim()).unwrap_or(condition);
            match Expr::compile(src) {
                Err(e) => errors.push(diag(
                    "UIT-E002",
                    DiagnosticSeverity::Error,
                    model,
                    None,
                    format!("Condition for \"{button}\" does not compile: {e}"),
                )),
                Ok(expr) => {
                    let foreign: Vec<&str> =
                        expr.identifiers().into_iter().filter(|n| *n != "row").collect();
                    if !foreign.is_empty() {
                        warnings.push(diag(
                            "UIT-W008",
                            DiagnosticSeverity::Warning,
                            model,
                            None,
                            format!(
                                "Condition for \"{button}\" reads {}; only `row` is in scope, so the button is always shown",
                                foreign.join(", ")
                            ),
                        ));
                    }
                }
            }
        }
    }

    // UIT-W003: action method other than GET/POST
    if let Some(methods) = &global.action_method {
        for (button, method) in methods {
            if HttpMethod::parse(method).is_none() {
                warnings.push(diag(
                    "UIT-W003",
                    DiagnosticSeverity::Warning,
                    model,
                    None,
                    format!("Method \"{method}\" for \"{button}\" is not GET or POST; POST is used"),
                ));
            }
        }
    }

    for (name, field) in &config.fields {
        check_field_expressions(model, name, field, &mut errors);
        check_field_vocabulary(model, name, field, &mut errors, &mut warnings);
    }

    ValidateResult { errors, warnings }
}

/// Check raw rows for keys the resolvers do not know (UIT-W005, UIT-W006).
/// Unknown keys are ignored at resolution, so these are warnings only.
pub fn validate_tags(model: &str, rows: &[RawTagField]) -> ValidateResult {
    let mut warnings = Vec::new();

    for row in rows {
        let is_model_row = row.field == UI_CONFIG_FIELD;
        for key in parse_tag(&row.tag).keys() {
            if is_model_row && !GLOBAL_ATTRIBUTE_INDEX.contains_key(key.as_str()) {
                warnings.push(diag(
                    "UIT-W006",
                    DiagnosticSeverity::Warning,
                    model,
                    None,
                    format!("Unknown model key \"{key}\""),
                ));
            } else if !is_model_row && !FIELD_ATTRIBUTE_INDEX.contains_key(key.as_str()) {
                warnings.push(diag(
                    "UIT-W005",
                    DiagnosticSeverity::Warning,
                    model,
                    Some(&row.field),
                    format!("Unknown field key \"{key}\""),
                ));
            }
        }
    }

    ValidateResult {
        errors: Vec::new(),
        warnings,
    }
}

fn diag(
    code: &str,
    severity: DiagnosticSeverity,
    model: &str,
    field: Option<&str>,
    message: String,
) -> Diagnostic {
    Diagnostic {
        code: code.into(),
        severity,
        model: model.into(),
        field: field.map(String::from),
        message,
    }
}

fn action_maps(global: &ModelGlobalConfig) -> Vec<(&'static str, &ActionMap)> {
    [
        ("action-item-condition", &global.action_item_condition),
        ("action-label", &global.action_label),
        ("action-icon", &global.action_icon),
        ("action-class", &global.action_class),
        ("action-permission", &global.action_permission),
        ("action-api", &global.action_api),
        ("action-method", &global.action_method),
        ("action-callback", &global.action_callback),
    ]
    .into_iter()
    .filter_map(|(attr, map)| map.as_ref().map(|m| (attr, m)))
    .collect()
}

// UIT-E003: `{{ }}` field values that do not compile
fn check_field_expressions(
    model: &str,
    name: &str,
    field: &FieldConfig,
    errors: &mut Vec<Diagnostic>,
) {
    let scalar = |v: &Option<TagValue>| v.as_ref().and_then(TagValue::as_str).map(String::from);
    let mut candidates: Vec<(String, String)> = [
        ("default", scalar(&field.default)),
        ("disabled", scalar(&field.disabled)),
        ("add-disabled", scalar(&field.add_disabled)),
        ("edit-disabled", scalar(&field.edit_disabled)),
        ("search-default", scalar(&field.search_default)),
    ]
    .into_iter()
    .filter_map(|(attr, v)| Some((attr.to_string(), v?)))
    .collect();

    if let Some(ApiParams::Map(params)) = &field.api_params {
        candidates.extend(
            params
                .iter()
                .map(|(k, v)| (format!("api-params.{k}"), v.clone())),
        );
    }

    for (attr, value) in candidates {
        let Some(body) = template_body(&value) else {
            continue;
        };
        if body.is_empty() {
            continue;
        }
        if let Err(e) = Expr::compile(body) {
            errors.push(diag(
                "UIT-E003",
                DiagnosticSeverity::Error,
                model,
                Some(name),
                format!("{attr} expression does not compile: {e}"),
            ));
        }
    }
}

fn check_field_vocabulary(
    model: &str,
    name: &str,
    field: &FieldConfig,
    errors: &mut Vec<Diagnostic>,
    warnings: &mut Vec<Diagnostic>,
) {
    // UIT-E004: unknown formatter type
    if let Some(spec) = field.formatter.as_deref().and_then(FormatterSpec::parse) {
        if let FormatterKind::Unknown(kind) = spec.kind {
            errors.push(diag(
                "UIT-E004",
                DiagnosticSeverity::Error,
                model,
                Some(name),
                format!("Unknown formatter type \"{kind}\""),
            ));
        }
    }

    // UIT-W001: unknown relation mode
    if let Some(mode) = &field.mode {
        if RelationMode::parse(mode).is_none() {
            warnings.push(diag(
                "UIT-W001",
                DiagnosticSeverity::Warning,
                model,
                Some(name),
                format!("Unknown mode \"{mode}\"; rendered as flat"),
            ));
        }
    }

    // UIT-W002: unknown search operator
    if let Some(op) = &field.op {
        if SearchOperator::parse(op).is_none() {
            warnings.push(diag(
                "UIT-W002",
                DiagnosticSeverity::Warning,
                model,
                Some(name),
                format!("Unknown search operator \"{op}\"; treated as eq"),
            ));
        }
    }

    // UIT-W004: multiple without the `in` operator
    if field.multiple == Some(true) && field.search_operator() != SearchOperator::In {
        warnings.push(diag(
            "UIT-W004",
            DiagnosticSeverity::Warning,
            model,
            Some(name),
            "multiple is set but the search operator is not \"in\"".to_string(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::assemble;
    use pretty_assertions::assert_eq;

    fn assemble_and_validate(rows: &[(&str, &str)]) -> ValidateResult {
        let rows: Vec<RawTagField> = rows
            .iter()
            .map(|(f, t)| RawTagField::new(*f, *t))
            .collect();
        validate(&assemble("sysuser", &rows))
    }

    fn codes(list: &[Diagnostic]) -> Vec<&str> {
        list.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn validate_clean() {
        let result = assemble_and_validate(&[
            (
                "UIConfig",
                "actions:view,edit,custom:Audit;action-permission:Audit=sysuser:audit",
            ),
            ("status", "label:状态;search;op:in;multiple;formatter:custom:statusText"),
            ("created_at", "formatter:datetime:YYYY-MM-DD HH:mm"),
            ("depts", "path:depts;path-item:name;mode:tags"),
        ]);
        assert!(result.is_clean(), "{result:?}");
    }

    #[test]
    fn validate_e001_orphan_action_key() {
        let result =
            assemble_and_validate(&[("UIConfig", "actions:view;action-label:Export=导出")]);
        assert_eq!(codes(&result.errors), vec!["UIT-E001"]);
        assert!(result.errors[0].message.contains("Export"));
    }

    #[test]
    fn validate_e002_condition_syntax() {
        let result = assemble_and_validate(&[(
            "UIConfig",
            "actions:edit;action-item-condition:edit=row.status ===",
        )]);
        assert_eq!(codes(&result.errors), vec!["UIT-E002"]);
    }

    #[test]
    fn validate_w008_condition_outside_scope() {
        let result = assemble_and_validate(&[(
            "UIConfig",
            "actions:edit;action-item-condition:edit=formData.locked",
        )]);
        assert_eq!(codes(&result.warnings), vec!["UIT-W008"]);
    }

    #[test]
    fn validate_e003_field_expression() {
        let result = assemble_and_validate(&[
            ("name", "default:{{ formData. }}"),
            ("dept", "api-params:parent={{ ( }}"),
            ("ok", "disabled:{{ formData.locked }}"),
        ]);
        assert_eq!(codes(&result.errors), vec!["UIT-E003", "UIT-E003"]);
        assert_eq!(result.errors[0].field.as_deref(), Some("name"));
        assert_eq!(result.errors[1].field.as_deref(), Some("dept"));
    }

    #[test]
    fn validate_e004_unknown_formatter() {
        let result = assemble_and_validate(&[("price", "formatter:money:2")]);
        assert_eq!(codes(&result.errors), vec!["UIT-E004"]);
    }

    #[test]
    fn validate_vocabulary_warnings() {
        let result = assemble_and_validate(&[
            ("UIConfig", "actions:custom:Export;action-method:Export=PUT"),
            ("a", "mode:grid"),
            ("b", "search;op:between"),
            ("c", "search;multiple"),
        ]);
        assert_eq!(
            codes(&result.warnings),
            vec!["UIT-W003", "UIT-W001", "UIT-W002", "UIT-W004"]
        );
    }

    #[test]
    fn validate_w007_unknown_button() {
        let result = assemble_and_validate(&[("UIConfig", "actions:view,approve")]);
        assert_eq!(codes(&result.warnings), vec!["UIT-W007"]);
    }

    #[test]
    fn validate_tags_unknown_keys() {
        let rows = vec![
            RawTagField::new("UIConfig", "actions:view;theme:dark"),
            RawTagField::new("name", "label:Name;colour:red"),
        ];
        let result = validate_tags("sysuser", &rows);
        assert_eq!(codes(&result.warnings), vec!["UIT-W006", "UIT-W005"]);
        assert_eq!(result.warnings[1].field.as_deref(), Some("name"));
    }
}
