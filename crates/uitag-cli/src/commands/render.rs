use std::path::Path;

use serde_json::Value;
use uitag_core::{visible_buttons, DisplayValue, FormMode, Formatter, PermissionSet};

use crate::reader::read_json_arg;
use crate::{build_single_config, project_config, to_json};

/// Render each row's table cells. `human` prints a tab-separated table with
/// labels as header; `json` prints one `{field: DisplayValue}` object per row.
pub fn run_render(input_path: &Path, rows: &str, format: &str) -> Result<String, String> {
    let config = build_single_config(input_path)?;
    let formatter = Formatter::new(project_config(input_path).render);

    let rows = match read_json_arg(rows)? {
        Value::Array(rows) => rows,
        other => vec![other],
    };
    let columns = config.fields_for(FormMode::Table);

    if format == "json" {
        let rendered: Vec<serde_json::Map<String, Value>> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|(name, field)| {
                        let cell: DisplayValue =
                            formatter.render_cell(row, name, field, &config.model);
                        serde_json::to_value(cell).map(|v| (name.to_string(), v))
                    })
                    .collect::<Result<serde_json::Map<String, Value>, _>>()
            })
            .collect::<Result<_, _>>()
            .map_err(|e| format!("JSON serialization error: {e}"))?;
        return to_json(&rendered);
    }

    let mut lines: Vec<String> = Vec::with_capacity(rows.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|(name, field)| field.label_or(name))
            .collect::<Vec<_>>()
            .join("\t"),
    );
    for row in &rows {
        lines.push(
            formatter
                .export_row(row, columns.iter().copied(), &config.model)
                .join("\t"),
        );
    }
    Ok(lines.join("\n"))
}

/// Buttons the user holding `permissions` may use on `row`, as JSON.
pub fn run_buttons(input_path: &Path, permissions: &str, row: Option<&str>) -> Result<String, String> {
    let config = build_single_config(input_path)?;
    let permissions: PermissionSet = serde_json::from_value(read_json_arg(permissions)?)
        .map_err(|e| format!("Permissions must be an array of strings: {e}"))?;
    let row = row.map(read_json_arg).transpose()?;

    to_json(&visible_buttons(&config, &permissions, row.as_ref()))
}
