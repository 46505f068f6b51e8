//! JSON-in / JSON-out API for cross-language bindings.
//!
//! Every function takes strings and returns a JSON envelope
//! `{ "success": bool, "data"?: ..., "error"?: "..." }`, keeping the
//! binding surface small.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expression::{evaluate_condition, evaluate_template};
use crate::formatter::Formatter;
use crate::parser::parse_tag;
use crate::permissions::{visible_buttons, PermissionSet};
use crate::resolver::assemble;
use crate::settings::RenderSettings;
use crate::types::*;
use crate::validator::{validate, validate_tags};

const SERIALIZATION_FAILURE: &str =
    r#"{"success":false,"error":"JSON serialization error"}"#;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct FfiResult<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn respond<T: Serialize>(result: Result<T, String>) -> String {
    let envelope = match result {
        Ok(data) => serde_json::to_string(&FfiResult {
            success: true,
            data: Some(data),
            error: None,
        }),
        Err(error) => serde_json::to_string(&FfiResult::<()> {
            success: false,
            data: None,
            error: Some(error),
        }),
    };
    envelope.unwrap_or_else(|_| SERIALIZATION_FAILURE.to_string())
}

fn input<T: DeserializeOwned>(json: &str, what: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {what} JSON: {e}"))
}

/// Blank input means the type's default.
fn optional_input<T: DeserializeOwned + Default>(json: &str, what: &str) -> Result<T, String> {
    if json.trim().is_empty() {
        Ok(T::default())
    } else {
        input(json, what)
    }
}

fn guarded<T>(f: impl FnOnce() -> Result<T, String> + std::panic::UnwindSafe) -> Result<T, String> {
    std::panic::catch_unwind(f).unwrap_or_else(|_| Err("Internal panic".to_string()))
}

// ---------------------------------------------------------------------------
// Options types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationOptions {
    pub path: Option<String>,
    pub path_item: Option<String>,
    pub mode: Option<String>,
    pub model: String,
}

/// Output of `validate_to_json`: tag-level and configuration-level findings.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateReport {
    pub config: ParsedUIConfig,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Tag string → ordered key/value map.
pub fn parse_tag_to_json(tag: &str) -> String {
    respond(guarded(|| Ok(parse_tag(tag))))
}

/// Model name + JSON array of `{field, tag}` rows → `ParsedUIConfig`.
pub fn assemble_to_json(model: &str, rows_json: &str) -> String {
    respond(input::<Vec<RawTagField>>(rows_json, "rows").and_then(|rows| {
        guarded(move || Ok(assemble(model, &rows)))
    }))
}

/// Assemble and report every diagnostic for the rows.
pub fn validate_to_json(model: &str, rows_json: &str) -> String {
    respond(input::<Vec<RawTagField>>(rows_json, "rows").and_then(|rows| {
        guarded(move || {
            let config = assemble(model, &rows);
            let tags = validate_tags(model, &rows);
            let semantic = validate(&config);
            Ok(ValidateReport {
                config,
                errors: semantic.errors,
                warnings: tags.warnings.into_iter().chain(semantic.warnings).collect(),
            })
        })
    }))
}

/// `{{ }}` value against a JSON context object. `data` is `null` when the
/// expression yields nothing.
pub fn evaluate_to_json(template: &str, context_json: &str) -> String {
    respond(
        optional_input::<Value>(context_json, "context")
            .and_then(|ctx| guarded(move || Ok(evaluate_template(template, &ctx)))),
    )
}

/// Button condition against a row; `data` is the visibility.
pub fn condition_to_json(condition: &str, row_json: &str) -> String {
    respond(optional_input::<Option<Value>>(row_json, "row").and_then(|row| {
        guarded(move || Ok(evaluate_condition(condition, row.as_ref())))
    }))
}

/// Format one JSON value with a formatter spec.
pub fn format_to_json(value_json: &str, spec: &str, settings_json: &str) -> String {
    respond(
        optional_input::<Option<Value>>(value_json, "value").and_then(|value| {
            let settings: RenderSettings = optional_input(settings_json, "settings")?;
            guarded(move || {
                let formatter = Formatter::new(settings);
                let spec = (!spec.trim().is_empty()).then_some(spec);
                Ok(formatter.format_value(value.as_ref(), spec))
            })
        }),
    )
}

/// Relation rendering of a row; options are `{path, pathItem, mode, model}`.
pub fn render_relation_to_json(row_json: &str, options_json: &str, settings_json: &str) -> String {
    let prepared = input::<Value>(row_json, "row").and_then(|row| {
        let options: RelationOptions = optional_input(options_json, "options")?;
        let settings: RenderSettings = optional_input(settings_json, "settings")?;
        Ok((row, options, settings))
    });
    respond(prepared.and_then(|(row, options, settings)| {
        guarded(move || {
            let mode = options
                .mode
                .as_deref()
                .and_then(RelationMode::parse)
                .unwrap_or_default();
            Ok(Formatter::new(settings).render_relation(
                &row,
                options.path.as_deref(),
                options.path_item.as_deref(),
                mode,
                &options.model,
            ))
        })
    }))
}

/// Buttons the user may use on a row, given an assembled configuration and
/// a JSON array of permission identifiers.
pub fn buttons_to_json(config_json: &str, permissions_json: &str, row_json: &str) -> String {
    let prepared = input::<ParsedUIConfig>(config_json, "config").and_then(|config| {
        let permissions: PermissionSet = input(permissions_json, "permissions")?;
        let row: Option<Value> = optional_input(row_json, "row")?;
        Ok((config, permissions, row))
    });
    respond(prepared.and_then(|(config, permissions, row)| {
        guarded(move || Ok(visible_buttons(&config, &permissions, row.as_ref())))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(out: &str) -> Value {
        serde_json::from_str(out).unwrap()
    }

    #[test]
    fn parse_tag_envelope() {
        let out = parse(&parse_tag_to_json("label:Name;required"));
        assert_eq!(out, json!({"success": true, "data": {"label": "Name", "required": true}}));
    }

    #[test]
    fn invalid_input_is_reported() {
        let out = parse(&assemble_to_json("m", "not json"));
        assert_eq!(out["success"], json!(false));
        assert!(out["error"].as_str().unwrap().starts_with("Invalid rows JSON"));
    }

    #[test]
    fn undefined_evaluation_omits_data() {
        let out = parse(&evaluate_to_json("{{ row.missing }}", r#"{"row": {}}"#));
        assert_eq!(out, json!({"success": true, "data": null}));
    }
}
