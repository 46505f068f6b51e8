//! Relation rendering and table cells.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::formatter::Formatter;
use crate::types::{FieldConfig, RelationMode};
use crate::value::{self, to_display_string};

/// Rendered cell content. Rich variants describe what a presentation layer
/// draws; `to_plain_text` flattens them for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DisplayValue {
    Text { text: String },
    Image { src: String, width: u32, height: u32 },
    Tags { items: Vec<String> },
    AvatarGroup { items: Vec<String> },
    Link { href: String, text: String },
}

impl DisplayValue {
    pub fn text(text: impl Into<String>) -> Self {
        DisplayValue::Text { text: text.into() }
    }

    /// Images flatten to their source, item lists join with `separator`.
    pub fn to_plain_text(&self, separator: &str) -> String {
        match self {
            DisplayValue::Text { text } | DisplayValue::Link { text, .. } => text.clone(),
            DisplayValue::Image { src, .. } => src.clone(),
            DisplayValue::Tags { items } | DisplayValue::AvatarGroup { items } => {
                items.join(separator)
            }
        }
    }
}

/// Walk a dotted path; array segments index by position.
fn walk<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Display strings of the related items, `None` when there is nothing to show.
fn relation_items(row: &Value, path: Option<&str>, path_item: Option<&str>) -> Option<Vec<String>> {
    if !value::is_truthy(row) {
        return None;
    }
    let target = match path.filter(|p| !p.is_empty()) {
        Some(p) => walk(row, p)?,
        None => row,
    };

    let items: Vec<String> = match target {
        Value::Array(elements) => match path_item.filter(|p| !p.is_empty()) {
            Some(item_path) => elements
                .iter()
                .filter_map(|e| walk(e, item_path))
                .filter(|v| !value::is_blank(Some(v)))
                .map(to_display_string)
                .collect(),
            None => elements.iter().map(to_display_string).collect(),
        },
        other if value::is_blank(Some(other)) => return None,
        other => vec![to_display_string(other)],
    };

    (!items.is_empty()).then_some(items)
}

impl Formatter {
    fn relation_display(&self, mut items: Vec<String>, mode: RelationMode, model: &str) -> DisplayValue {
        let settings = &self.settings;
        match mode {
            RelationMode::Flat => DisplayValue::text(items.join(&settings.flat_separator)),
            RelationMode::Tags => DisplayValue::Tags { items },
            RelationMode::AvatarGroup => DisplayValue::AvatarGroup { items },
            RelationMode::Count => {
                DisplayValue::text(format!("{}{}", items.len(), settings.count_unit))
            }
            RelationMode::Link => {
                let first = items.swap_remove(0);
                DisplayValue::Link {
                    href: settings.link_href(model, &first),
                    text: first,
                }
            }
        }
    }

    /// Follow `path` into `row`, collect `path_item` from each element when
    /// the target is an array, and render per `mode`. Missing data gives the
    /// placeholder. `model` fills the detail route in `link` mode.
    pub fn render_relation(
        &self,
        row: &Value,
        path: Option<&str>,
        path_item: Option<&str>,
        mode: RelationMode,
        model: &str,
    ) -> DisplayValue {
        match relation_items(row, path, path_item) {
            Some(items) => self.relation_display(items, mode, model),
            None => self.placeholder(),
        }
    }

    /// One table cell: the field's formatter when it has one, otherwise its
    /// relation settings, otherwise the raw value. Empty cells show the
    /// field's `empty-text` when set.
    pub fn render_cell(
        &self,
        row: &Value,
        field_name: &str,
        field: &FieldConfig,
        model: &str,
    ) -> DisplayValue {
        let empty = || match &field.empty_text {
            Some(text) => DisplayValue::text(text),
            None => self.placeholder(),
        };

        if field.formatter.as_deref().is_some_and(|f| !f.trim().is_empty()) {
            let raw = row.get(field_name);
            if value::is_blank(raw) {
                return empty();
            }
            return self.format_value(raw, field.formatter.as_deref());
        }

        if field.is_relation() {
            return match relation_items(row, field.path.as_deref(), field.path_item.as_deref()) {
                Some(items) => self.relation_display(items, field.relation_mode(), model),
                None => empty(),
            };
        }

        match row.get(field_name) {
            raw if value::is_blank(raw) => empty(),
            Some(raw) => DisplayValue::text(to_display_string(raw)),
            None => empty(),
        }
    }

    /// Plain-text rendering of a whole row for export, in `fields` order.
    pub fn export_row<'f>(
        &self,
        row: &Value,
        fields: impl IntoIterator<Item = (&'f str, &'f FieldConfig)>,
        model: &str,
    ) -> Vec<String> {
        fields
            .into_iter()
            .map(|(name, field)| {
                self.render_cell(row, name, field, model)
                    .to_plain_text(&self.settings.flat_separator)
            })
            .collect()
    }
}
