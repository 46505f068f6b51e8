use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalogs::CUSTOM_BUTTON_PREFIX;

// ---------------------------------------------------------------------------
// Backend input
// ---------------------------------------------------------------------------

/// One backend-declared configuration row. `field` is a data field name or
/// the `UIConfig` sentinel for model-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTagField {
    pub field: String,
    pub tag: String,
}

impl RawTagField {
    pub fn new(field: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            tag: tag.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tag grammar output
// ---------------------------------------------------------------------------

/// Typed scalar produced by the tag grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl TagValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Script-style truthiness: `false`, `0`, `NaN` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            TagValue::Bool(b) => *b,
            TagValue::Number(n) => *n != 0.0 && !n.is_nan(),
            TagValue::String(s) => !s.is_empty(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TagValue::Bool(b) => serde_json::Value::Bool(*b),
            TagValue::Number(n) => crate::value::number_to_json(*n),
            TagValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(b) => write!(f, "{b}"),
            TagValue::Number(n) => write!(f, "{n}"),
            TagValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for TagValue {
    fn from(b: bool) -> Self {
        TagValue::Bool(b)
    }
}

impl From<f64> for TagValue {
    fn from(n: f64) -> Self {
        TagValue::Number(n)
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        TagValue::String(s.to_string())
    }
}

/// Ordered lowercase key → scalar mapping for one tag string.
pub type ParsedTagMap = IndexMap<String, TagValue>;

/// Button-keyed settings packed in one model tag value (`view=查看`).
pub type ActionMap = IndexMap<String, String>;

// ---------------------------------------------------------------------------
// Buttons
// ---------------------------------------------------------------------------

/// A declared row action: a built-in token (`view`, `edit`, `delete`, `add`)
/// or a `custom:<name>` token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonId(String);

impl ButtonId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_custom(&self) -> bool {
        self.0.starts_with(CUSTOM_BUTTON_PREFIX)
    }

    /// Name with the `custom:` prefix stripped; the key used by action maps.
    pub fn bare_name(&self) -> &str {
        self.0
            .strip_prefix(CUSTOM_BUTTON_PREFIX)
            .unwrap_or(&self.0)
    }

    pub fn builtin(&self) -> Option<BuiltInButton> {
        match self.0.as_str() {
            "view" => Some(BuiltInButton::View),
            "edit" => Some(BuiltInButton::Edit),
            "delete" => Some(BuiltInButton::Delete),
            "add" => Some(BuiltInButton::Add),
            _ => None,
        }
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ButtonId {
    fn from(s: &str) -> Self {
        ButtonId::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltInButton {
    View,
    Edit,
    Delete,
    Add,
}

impl BuiltInButton {
    pub fn token(self) -> &'static str {
        match self {
            BuiltInButton::View => "view",
            BuiltInButton::Edit => "edit",
            BuiltInButton::Delete => "delete",
            BuiltInButton::Add => "add",
        }
    }
}

// ---------------------------------------------------------------------------
// Closed vocabularies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationMode {
    #[default]
    Flat,
    Tags,
    AvatarGroup,
    Count,
    Link,
}

impl RelationMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "flat" => Some(RelationMode::Flat),
            "tags" => Some(RelationMode::Tags),
            "avatar-group" => Some(RelationMode::AvatarGroup),
            "count" => Some(RelationMode::Count),
            "link" => Some(RelationMode::Link),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchOperator {
    #[default]
    Eq,
    Ne,
    Like,
    NotLike,
    Gt,
    Gte,
    Lt,
    Lte,
    Range,
    In,
    IsNull,
    IsNotNull,
}

impl SearchOperator {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(SearchOperator::Eq),
            "ne" => Some(SearchOperator::Ne),
            "like" => Some(SearchOperator::Like),
            "notlike" => Some(SearchOperator::NotLike),
            "gt" => Some(SearchOperator::Gt),
            "gte" => Some(SearchOperator::Gte),
            "lt" => Some(SearchOperator::Lt),
            "lte" => Some(SearchOperator::Lte),
            "range" => Some(SearchOperator::Range),
            "in" => Some(SearchOperator::In),
            "isnull" => Some(SearchOperator::IsNull),
            "isnotnull" => Some(SearchOperator::IsNotNull),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    /// Case-insensitive; anything but GET/POST is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Align::Left),
            "center" => Some(Align::Center),
            "right" => Some(Align::Right),
            _ => None,
        }
    }
}

/// Presentation context a field can be shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMode {
    Add,
    Edit,
    Detail,
    Table,
    Search,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// `api-params` after resolution: a parsed `k=v` map, or a non-string scalar
/// passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiParams {
    Map(IndexMap<String, String>),
    Value(TagValue),
}

/// Sparse field-level configuration. Absent attributes stay `None`;
/// protocol defaults are applied by the accessors in `presentation`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldConfig {
    // Basics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,

    // Form state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<TagValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<TagValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_disabled: Option<TagValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_disabled: Option<TagValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    // Layout and styling
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<TagValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_span: Option<TagValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<TagValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ellipsis: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_label_width: Option<TagValue>,

    // Data source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_params: Option<ApiParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depend: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loading_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_options_text: Option<String>,

    // Search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_default: Option<TagValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,

    // Validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,

    // Relations and formatting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
}

/// Model-level configuration from the `UIConfig` row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelGlobalConfig {
    /// Empty means unset.
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ButtonId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_width: Option<TagValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_item_condition: Option<ActionMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_label: Option<ActionMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_icon: Option<ActionMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_class: Option<ActionMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_permission: Option<ActionMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_api: Option<ActionMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_method: Option<ActionMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_callback: Option<ActionMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_default_count: Option<TagValue>,
}

/// Complete configuration for one model. Never mutated once cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedUIConfig {
    pub model: String,
    pub global: ModelGlobalConfig,
    pub fields: IndexMap<String, FieldConfig>,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: DiagnosticSeverity,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateResult {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidateResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}
