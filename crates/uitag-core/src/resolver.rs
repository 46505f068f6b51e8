use indexmap::IndexMap;
use log::{debug, info};

use crate::catalogs::{
    FieldAttr, GlobalAttr, DEFAULT_ACTION_WIDTH, DEFAULT_SEARCH_DEFAULT_COUNT,
    FIELD_ATTRIBUTES, GLOBAL_ATTRIBUTES, UI_CONFIG_FIELD,
};
use crate::parser::parse_tag;
use crate::value::parse_number;
use crate::types::*;

// ---------------------------------------------------------------------------
// Field level
// ---------------------------------------------------------------------------

/// Map a parsed field tag onto `FieldConfig`. Unknown keys are ignored and
/// absent attributes stay unset.
pub fn resolve_field(map: &ParsedTagMap) -> FieldConfig {
    let mut config = FieldConfig::default();

    for (key, attr) in FIELD_ATTRIBUTES {
        if let Some(value) = map.get(*key) {
            apply_field_attr(&mut config, *attr, value);
        }
    }

    config
}

fn apply_field_attr(config: &mut FieldConfig, attr: FieldAttr, value: &TagValue) {
    match attr {
        FieldAttr::Label => config.label = Some(value.to_string()),
        FieldAttr::Sort => config.sort = number(attr, value),
        FieldAttr::Hidden => config.hidden = flag(attr, value),
        FieldAttr::Table => config.table = flag(attr, value),
        FieldAttr::Form => config.form = flag(attr, value),
        FieldAttr::Detail => config.detail = flag(attr, value),
        FieldAttr::EmptyText => config.empty_text = Some(value.to_string()),
        FieldAttr::Tooltip => config.tooltip = Some(value.to_string()),
        FieldAttr::Default => config.default = Some(value.clone()),
        FieldAttr::Placeholder => config.placeholder = Some(value.to_string()),
        FieldAttr::Disabled => config.disabled = Some(value.clone()),
        FieldAttr::Readonly => config.readonly = flag(attr, value),
        FieldAttr::AddHidden => config.add_hidden = flag(attr, value),
        FieldAttr::EditHidden => config.edit_hidden = flag(attr, value),
        FieldAttr::DetailHidden => config.detail_hidden = flag(attr, value),
        FieldAttr::AddDisabled => config.add_disabled = Some(value.clone()),
        FieldAttr::EditDisabled => config.edit_disabled = Some(value.clone()),
        FieldAttr::Required => config.required = flag(attr, value),
        FieldAttr::Type => config.component_type = Some(value.to_string()),
        FieldAttr::Span => config.span = Some(value.clone()),
        FieldAttr::SearchSpan => config.search_span = Some(value.clone()),
        FieldAttr::UiClass => config.ui_class = Some(value.to_string()),
        FieldAttr::TableClass => config.table_class = Some(value.to_string()),
        FieldAttr::FormClass => config.form_class = Some(value.to_string()),
        FieldAttr::Align => config.align = Some(value.to_string()),
        FieldAttr::Width => config.width = Some(value.clone()),
        FieldAttr::MinWidth => config.min_width = number(attr, value),
        FieldAttr::Ellipsis => config.ellipsis = flag(attr, value),
        FieldAttr::FormLabelWidth => config.form_label_width = Some(value.clone()),
        FieldAttr::Options => config.options = Some(value.to_string()),
        FieldAttr::Api => config.api = Some(value.to_string()),
        FieldAttr::ApiParams => config.api_params = Some(api_params(value)),
        FieldAttr::Depend => config.depend = depend_list(value),
        FieldAttr::LabelKey => config.label_key = Some(value.to_string()),
        FieldAttr::ValueKey => config.value_key = Some(value.to_string()),
        FieldAttr::ApiMethod => config.api_method = Some(value.to_string()),
        FieldAttr::LoadingText => config.loading_text = Some(value.to_string()),
        FieldAttr::EmptyOptionsText => config.empty_options_text = Some(value.to_string()),
        FieldAttr::Search => config.search = flag(attr, value),
        FieldAttr::Op => config.op = Some(value.to_string()),
        FieldAttr::SearchDefault => config.search_default = Some(value.clone()),
        FieldAttr::SearchPlaceholder => config.search_placeholder = Some(value.to_string()),
        FieldAttr::Multiple => config.multiple = flag(attr, value),
        FieldAttr::Rules => config.rules = Some(value.to_string()),
        FieldAttr::Path => config.path = Some(value.to_string()),
        FieldAttr::PathItem => config.path_item = Some(value.to_string()),
        FieldAttr::Mode => config.mode = Some(value.to_string()),
        FieldAttr::Formatter => config.formatter = Some(value.to_string()),
    }
}

/// Flags take any value by truthiness, so `hidden:1` hides and
/// `required:0` does not require.
fn flag(attr: FieldAttr, value: &TagValue) -> Option<bool> {
    if value.as_bool().is_none() {
        debug!("reading {value:?} for {attr:?} by truthiness");
    }
    Some(value.is_truthy())
}

fn number(attr: FieldAttr, value: &TagValue) -> Option<f64> {
    let n = match value {
        TagValue::String(s) => parse_number(s.trim()),
        other => other.as_f64(),
    };
    if n.is_none() {
        debug!("ignoring non-numeric value {value:?} for {attr:?}");
    }
    n
}

fn depend_list(value: &TagValue) -> Option<Vec<String>> {
    match value {
        TagValue::String(s) => Some(split_list(s)),
        TagValue::Number(_) => Some(vec![value.to_string()]),
        TagValue::Bool(_) => {
            debug!("ignoring boolean depend value");
            None
        }
    }
}

fn api_params(value: &TagValue) -> ApiParams {
    match value {
        TagValue::String(s) => ApiParams::Map(split_pairs(s, false)),
        other => ApiParams::Value(other.clone()),
    }
}

// ---------------------------------------------------------------------------
// Model level
// ---------------------------------------------------------------------------

/// Map the parsed `UIConfig` tag onto `ModelGlobalConfig`. Defaults are
/// not filled here; see `assemble`.
pub fn resolve_global(map: &ParsedTagMap) -> ModelGlobalConfig {
    let mut config = ModelGlobalConfig::default();

    for (key, attr) in GLOBAL_ATTRIBUTES {
        let Some(value) = map.get(*key) else {
            continue;
        };

        if attr.is_action_map() {
            // Only string values carry a map; anything else is dropped.
            let Some(raw) = value.as_str() else {
                debug!("ignoring non-string value {value:?} for {key}");
                continue;
            };
            let entries = Some(split_pairs(raw, true));
            match attr {
                GlobalAttr::ActionItemCondition => config.action_item_condition = entries,
                GlobalAttr::ActionLabel => config.action_label = entries,
                GlobalAttr::ActionIcon => config.action_icon = entries,
                GlobalAttr::ActionClass => config.action_class = entries,
                GlobalAttr::ActionPermission => config.action_permission = entries,
                GlobalAttr::ActionApi => config.action_api = entries,
                GlobalAttr::ActionMethod => config.action_method = entries,
                GlobalAttr::ActionCallback => config.action_callback = entries,
                _ => {}
            }
            continue;
        }

        match attr {
            GlobalAttr::Model => config.model = value.to_string(),
            GlobalAttr::Actions => match value.as_str() {
                Some(s) => {
                    config.actions = Some(split_list(s).into_iter().map(ButtonId::new).collect())
                }
                None => debug!("ignoring non-string actions value {value:?}"),
            },
            GlobalAttr::ActionWidth => config.action_width = Some(value.clone()),
            GlobalAttr::SearchDefaultCount => config.search_default_count = Some(value.clone()),
            _ => {}
        }
    }

    config
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Combine the model row and every field row into a complete configuration,
/// dropping globally hidden fields and filling model-level defaults.
pub fn assemble(model: &str, rows: &[RawTagField]) -> ParsedUIConfig {
    let mut config = ParsedUIConfig {
        model: model.to_string(),
        global: ModelGlobalConfig {
            model: model.to_string(),
            ..Default::default()
        },
        fields: IndexMap::new(),
    };

    for row in rows {
        let map = parse_tag(&row.tag);
        if row.field == UI_CONFIG_FIELD {
            merge_global(&mut config.global, resolve_global(&map));
            continue;
        }

        let field = resolve_field(&map);
        if field.hidden == Some(true) {
            debug!("{model}.{}: hidden, skipped", row.field);
            continue;
        }
        config.fields.insert(row.field.clone(), field);
    }

    fill_global_defaults(&mut config.global);
    info!(
        "assembled {model}: {} fields, {} actions",
        config.fields.len(),
        config.global.actions.as_ref().map_or(0, Vec::len)
    );

    config
}

/// Overlay the attributes `next` sets onto `base`.
fn merge_global(base: &mut ModelGlobalConfig, next: ModelGlobalConfig) {
    if !next.model.is_empty() {
        base.model = next.model;
    }
    macro_rules! overlay {
        ($($field:ident),* $(,)?) => {
            $(if next.$field.is_some() { base.$field = next.$field; })*
        };
    }
    overlay!(
        actions,
        action_width,
        action_item_condition,
        action_label,
        action_icon,
        action_class,
        action_permission,
        action_api,
        action_method,
        action_callback,
        search_default_count,
    );
}

/// Absent or falsy width/count fall back to the protocol defaults.
fn fill_global_defaults(global: &mut ModelGlobalConfig) {
    if !global.action_width.as_ref().is_some_and(TagValue::is_truthy) {
        global.action_width = Some(TagValue::Number(DEFAULT_ACTION_WIDTH));
    }
    if !global
        .search_default_count
        .as_ref()
        .is_some_and(TagValue::is_truthy)
    {
        global.search_default_count = Some(TagValue::Number(DEFAULT_SEARCH_DEFAULT_COUNT));
    }
}

// ---------------------------------------------------------------------------
// Value splitting
// ---------------------------------------------------------------------------

/// Comma-separated list, trimmed, empties dropped.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// `k=v;k=v` pairs, each split on its first `=` and trimmed. Entries without
/// `=` or with an empty key are dropped; `require_value` also drops empty
/// values.
pub fn split_pairs(s: &str, require_value: bool) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    for piece in s.split(';') {
        let Some((key, value)) = piece.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || (require_value && value.is_empty()) {
            continue;
        }
        map.insert(key.to_string(), value.to_string());
    }
    map
}
