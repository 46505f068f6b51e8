//! UI tag compiler WASM bindings.
//!
//! JavaScript-callable functions via wasm-bindgen. All functions take
//! string inputs and return JSON strings of the form
//! `{ success: boolean, data?: ..., error?: string }`.

use serde_json::json;
use uitag_core::ffi::{
    assemble_to_json, buttons_to_json, condition_to_json, evaluate_to_json, format_to_json,
    parse_tag_to_json, render_relation_to_json, validate_to_json,
};
use uitag_core::{assemble, RawTagField};
use uitag_lint::{LintConfig, Linter};
use wasm_bindgen::prelude::*;

/// Parse one tag string into its key/value map.
#[wasm_bindgen(js_name = "parseTag")]
pub fn wasm_parse_tag(tag: &str) -> String {
    parse_tag_to_json(tag)
}

/// Assemble a model configuration.
///
/// @param model - Model name as requested from the backend
/// @param rows_json - JSON array of `{ field: string, tag: string }` rows
#[wasm_bindgen(js_name = "assemble")]
pub fn wasm_assemble(model: &str, rows_json: &str) -> String {
    assemble_to_json(model, rows_json)
}

/// Assemble and return `{ config, errors, warnings }`.
#[wasm_bindgen(js_name = "validate")]
pub fn wasm_validate(model: &str, rows_json: &str) -> String {
    validate_to_json(model, rows_json)
}

/// Evaluate a `{{ }}` value against a context object
/// (`{ formData, row, ... }`). `data` is null when nothing is produced.
#[wasm_bindgen(js_name = "evaluate")]
pub fn wasm_evaluate(template: &str, context_json: &str) -> String {
    evaluate_to_json(template, context_json)
}

/// Evaluate a button condition against a row; `data` is the visibility.
#[wasm_bindgen(js_name = "evaluateCondition")]
pub fn wasm_evaluate_condition(condition: &str, row_json: &str) -> String {
    condition_to_json(condition, row_json)
}

/// Format one value.
///
/// @param value_json - The raw value as JSON
/// @param spec - Formatter spec, e.g. `currency:2` or `date:YYYY/MM/DD`
/// @param settings_json - Optional partial render settings
#[wasm_bindgen(js_name = "formatValue")]
pub fn wasm_format_value(value_json: &str, spec: &str, settings_json: &str) -> String {
    format_to_json(value_json, spec, settings_json)
}

/// Render a relation field of a row.
///
/// @param options_json - `{ path?, pathItem?, mode?, model }`
#[wasm_bindgen(js_name = "renderRelation")]
pub fn wasm_render_relation(row_json: &str, options_json: &str, settings_json: &str) -> String {
    render_relation_to_json(row_json, options_json, settings_json)
}

/// Buttons the current user may use on a row.
///
/// @param config_json - An assembled configuration (`assemble` output `data`)
/// @param permissions_json - JSON array of permission identifiers
/// @param row_json - The row, or an empty string for toolbar buttons
#[wasm_bindgen(js_name = "visibleButtons")]
pub fn wasm_visible_buttons(config_json: &str, permissions_json: &str, row_json: &str) -> String {
    buttons_to_json(config_json, permissions_json, row_json)
}

/// Lint a model's tag rows.
///
/// @param config_json - Optional `{ rules: { "<rule-id>": "off" | "warn" | "error" } }`
#[wasm_bindgen(js_name = "lint")]
pub fn wasm_lint(model: &str, rows_json: &str, config_json: &str) -> String {
    let result = lint(model, rows_json, config_json);
    let envelope = match result {
        Ok(data) => json!({ "success": true, "data": data }),
        Err(error) => json!({ "success": false, "error": error }),
    };
    envelope.to_string()
}

fn lint(model: &str, rows_json: &str, config_json: &str) -> Result<serde_json::Value, String> {
    let rows: Vec<RawTagField> =
        serde_json::from_str(rows_json).map_err(|e| format!("Invalid rows JSON: {e}"))?;
    let config: LintConfig = if config_json.trim().is_empty() {
        LintConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(|e| format!("Invalid lint config JSON: {e}"))?
    };
    let diagnostics = Linter::new(config).lint(&assemble(model, &rows));
    serde_json::to_value(diagnostics).map_err(|e| format!("JSON serialization error: {e}"))
}
