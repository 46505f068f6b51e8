//! Presentation-time defaults and context-dependent values.
//!
//! The resolver keeps `FieldConfig` sparse; these accessors fill in the
//! protocol defaults and evaluate `{{ }}` values against a caller scope.

use indexmap::IndexMap;
use serde_json::Value;

use crate::catalogs::{
    DEFAULT_ACTION_WIDTH, DEFAULT_COMPONENT_TYPE, DEFAULT_EMPTY_OPTIONS_TEXT,
    DEFAULT_LABEL_KEY, DEFAULT_LOADING_TEXT, DEFAULT_SEARCH_DEFAULT_COUNT, DEFAULT_SEARCH_SPAN,
    DEFAULT_SORT, DEFAULT_SPAN, DEFAULT_VALUE_KEY,
};
use crate::expression::{evaluate_template, Scope};
use crate::types::{
    Align, ApiParams, ButtonId, FieldConfig, FormMode, HttpMethod, ParsedUIConfig, RelationMode,
    SearchOperator, TagValue,
};
use crate::value::{self, parse_number};

fn tag_number(v: &TagValue) -> Option<f64> {
    match v {
        TagValue::Number(n) => Some(*n),
        TagValue::String(s) => parse_number(s),
        TagValue::Bool(_) => None,
    }
}

/// Literal scalars pass through; strings go through the template evaluator.
fn dynamic_value<S: Scope + ?Sized>(v: &TagValue, scope: &S) -> Option<Value> {
    match v {
        TagValue::String(s) => evaluate_template(s, scope),
        other => Some(other.to_json()),
    }
}

impl FieldConfig {
    pub fn label_or<'a>(&'a self, field_name: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(field_name)
    }

    pub fn sort_weight(&self) -> f64 {
        self.sort.unwrap_or(DEFAULT_SORT)
    }

    pub fn component(&self) -> &str {
        self.component_type.as_deref().unwrap_or(DEFAULT_COMPONENT_TYPE)
    }

    pub fn span_or_default(&self) -> f64 {
        self.span.as_ref().and_then(tag_number).unwrap_or(DEFAULT_SPAN)
    }

    pub fn search_span_or_default(&self) -> f64 {
        self.search_span
            .as_ref()
            .and_then(tag_number)
            .unwrap_or(DEFAULT_SEARCH_SPAN)
    }

    /// Unknown values fall back to `flat`.
    pub fn relation_mode(&self) -> RelationMode {
        self.mode
            .as_deref()
            .and_then(RelationMode::parse)
            .unwrap_or_default()
    }

    /// Unknown values fall back to `eq`.
    pub fn search_operator(&self) -> SearchOperator {
        self.op
            .as_deref()
            .and_then(SearchOperator::parse)
            .unwrap_or_default()
    }

    pub fn options_method(&self) -> HttpMethod {
        self.api_method
            .as_deref()
            .and_then(HttpMethod::parse)
            .unwrap_or_default()
    }

    pub fn alignment(&self) -> Align {
        self.align.as_deref().and_then(Align::parse).unwrap_or_default()
    }

    pub fn label_key_or_default(&self) -> &str {
        self.label_key.as_deref().unwrap_or(DEFAULT_LABEL_KEY)
    }

    pub fn value_key_or_default(&self) -> &str {
        self.value_key.as_deref().unwrap_or(DEFAULT_VALUE_KEY)
    }

    pub fn loading_text_or_default(&self) -> &str {
        self.loading_text.as_deref().unwrap_or(DEFAULT_LOADING_TEXT)
    }

    pub fn empty_options_text_or_default(&self) -> &str {
        self.empty_options_text
            .as_deref()
            .unwrap_or(DEFAULT_EMPTY_OPTIONS_TEXT)
    }

    /// Rendered by the relation renderer. A `mode` without `path` renders
    /// the row itself.
    pub fn is_relation(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        set(&self.path) || set(&self.mode)
    }

    pub fn is_visible(&self, mode: FormMode) -> bool {
        let on = |flag: Option<bool>| flag.unwrap_or(true);
        let off = |flag: Option<bool>| flag.unwrap_or(false);
        match mode {
            FormMode::Add => on(self.form) && !off(self.add_hidden),
            FormMode::Edit => on(self.form) && !off(self.edit_hidden),
            FormMode::Detail => on(self.detail) && !off(self.detail_hidden),
            FormMode::Table => on(self.table),
            FormMode::Search => off(self.search),
        }
    }

    /// Initial form value; `{{ }}` defaults are evaluated against `scope`.
    pub fn default_value<S: Scope + ?Sized>(&self, scope: &S) -> Option<Value> {
        dynamic_value(self.default.as_ref()?, scope)
    }

    pub fn search_default_value<S: Scope + ?Sized>(&self, scope: &S) -> Option<Value> {
        dynamic_value(self.search_default.as_ref()?, scope)
    }

    /// `readonly` always disables. Otherwise the mode-specific setting, when
    /// present, replaces the general `disabled` one.
    pub fn is_disabled<S: Scope + ?Sized>(&self, mode: FormMode, scope: &S) -> bool {
        if self.readonly == Some(true) {
            return true;
        }
        let specific = match mode {
            FormMode::Add => self.add_disabled.as_ref(),
            FormMode::Edit => self.edit_disabled.as_ref(),
            _ => None,
        };
        specific
            .or(self.disabled.as_ref())
            .and_then(|v| dynamic_value(v, scope))
            .is_some_and(|v| value::is_truthy(&v))
    }

    /// Request parameters for the options endpoint, with `{{ }}` values
    /// evaluated. Entries that evaluate to nothing are left out.
    pub fn resolved_api_params<S: Scope + ?Sized>(&self, scope: &S) -> IndexMap<String, Value> {
        let Some(ApiParams::Map(params)) = &self.api_params else {
            return IndexMap::new();
        };
        params
            .iter()
            .filter_map(|(k, v)| Some((k.clone(), evaluate_template(v, scope)?)))
            .collect()
    }
}

impl ParsedUIConfig {
    /// Fields shown in `mode`, ordered by sort weight then declaration order.
    pub fn fields_for(&self, mode: FormMode) -> Vec<(&str, &FieldConfig)> {
        let mut fields: Vec<(&str, &FieldConfig)> = self
            .fields
            .iter()
            .filter(|(_, f)| f.is_visible(mode))
            .map(|(name, f)| (name.as_str(), f))
            .collect();
        fields.sort_by(|a, b| a.1.sort_weight().total_cmp(&b.1.sort_weight()));
        fields
    }

    pub fn search_fields(&self) -> Vec<(&str, &FieldConfig)> {
        self.fields_for(FormMode::Search)
    }

    pub fn action_width(&self) -> f64 {
        self.global
            .action_width
            .as_ref()
            .and_then(tag_number)
            .filter(|n| *n != 0.0)
            .unwrap_or(DEFAULT_ACTION_WIDTH)
    }

    /// Number of search fields shown before the form is expanded.
    pub fn search_default_count(&self) -> usize {
        let n = self
            .global
            .search_default_count
            .as_ref()
            .and_then(tag_number)
            .filter(|n| *n > 0.0)
            .unwrap_or(DEFAULT_SEARCH_DEFAULT_COUNT);
        n.trunc() as usize
    }

    pub fn buttons(&self) -> &[ButtonId] {
        self.global.actions.as_deref().unwrap_or_default()
    }
}
