use uitag_core::{evaluate_condition, evaluate_template, Expr};

use crate::reader::read_json_arg;
use crate::to_json;

/// Evaluate a `{{ }}` value, or a button condition with `--condition`.
///
/// Template values print as JSON (`undefined` when the expression yields
/// nothing); conditions print `true`/`false`. A condition that does not
/// compile still prints `true`, with the compile error on stderr.
pub fn run_eval(expression: &str, context: Option<&str>, condition: bool) -> Result<String, String> {
    let context = context.map(read_json_arg).transpose()?;

    if condition {
        if let Some(body) = condition_body(expression) {
            if let Err(e) = Expr::compile(body) {
                eprintln!("warning: condition does not compile: {e}");
            }
        }
        return Ok(evaluate_condition(expression, context.as_ref()).to_string());
    }

    let scope = context.unwrap_or_else(|| serde_json::json!({}));
    match evaluate_template(expression, &scope) {
        Some(value) => to_json(&value),
        None => Ok("undefined".to_string()),
    }
}

fn condition_body(expression: &str) -> Option<&str> {
    let trimmed = expression.trim();
    let body = uitag_core::expression::template_body(trimmed).unwrap_or(trimmed);
    (!body.trim().is_empty()).then_some(body)
}
