use std::collections::HashMap;
use std::sync::LazyLock;

/// Field name that carries model-level configuration instead of a data field.
pub const UI_CONFIG_FIELD: &str = "UIConfig";

/// Prefix marking a backend-declared custom button (`custom:Audit`).
pub const CUSTOM_BUTTON_PREFIX: &str = "custom:";

/// Built-in row actions, in display order.
pub const BUILTIN_BUTTONS: &[&str] = &["view", "edit", "delete", "add"];

// Model-level defaults filled by the assembler.
pub const DEFAULT_ACTION_WIDTH: f64 = 150.0;
pub const DEFAULT_SEARCH_DEFAULT_COUNT: f64 = 3.0;

// Field-level presentation defaults.
pub const DEFAULT_SORT: f64 = 99.0;
pub const DEFAULT_COMPONENT_TYPE: &str = "UInput";
pub const DEFAULT_SPAN: f64 = 24.0;
pub const DEFAULT_SEARCH_SPAN: f64 = 6.0;
pub const DEFAULT_LABEL_KEY: &str = "label";
pub const DEFAULT_VALUE_KEY: &str = "value";
pub const DEFAULT_LOADING_TEXT: &str = "加载中...";
pub const DEFAULT_EMPTY_OPTIONS_TEXT: &str = "暂无数据";

/// Attributes of `FieldConfig`, addressed by the resolver's mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldAttr {
    Label,
    Sort,
    Hidden,
    Table,
    Form,
    Detail,
    EmptyText,
    Tooltip,
    Default,
    Placeholder,
    Disabled,
    Readonly,
    AddHidden,
    EditHidden,
    DetailHidden,
    AddDisabled,
    EditDisabled,
    Required,
    Type,
    Span,
    SearchSpan,
    UiClass,
    TableClass,
    FormClass,
    Align,
    Width,
    MinWidth,
    Ellipsis,
    FormLabelWidth,
    Options,
    Api,
    ApiParams,
    Depend,
    LabelKey,
    ValueKey,
    ApiMethod,
    LoadingText,
    EmptyOptionsText,
    Search,
    Op,
    SearchDefault,
    SearchPlaceholder,
    Multiple,
    Rules,
    Path,
    PathItem,
    Mode,
    Formatter,
}

/// Hyphenated tag key → field attribute.
pub const FIELD_ATTRIBUTES: &[(&str, FieldAttr)] = &[
    ("label", FieldAttr::Label),
    ("sort", FieldAttr::Sort),
    ("hidden", FieldAttr::Hidden),
    ("table", FieldAttr::Table),
    ("form", FieldAttr::Form),
    ("detail", FieldAttr::Detail),
    ("empty-text", FieldAttr::EmptyText),
    ("tooltip", FieldAttr::Tooltip),
    ("default", FieldAttr::Default),
    ("placeholder", FieldAttr::Placeholder),
    ("disabled", FieldAttr::Disabled),
    ("readonly", FieldAttr::Readonly),
    ("add-hidden", FieldAttr::AddHidden),
    ("edit-hidden", FieldAttr::EditHidden),
    ("detail-hidden", FieldAttr::DetailHidden),
    ("add-disabled", FieldAttr::AddDisabled),
    ("edit-disabled", FieldAttr::EditDisabled),
    ("required", FieldAttr::Required),
    ("type", FieldAttr::Type),
    ("span", FieldAttr::Span),
    ("search-span", FieldAttr::SearchSpan),
    ("ui-class", FieldAttr::UiClass),
    ("table-class", FieldAttr::TableClass),
    ("form-class", FieldAttr::FormClass),
    ("align", FieldAttr::Align),
    ("width", FieldAttr::Width),
    ("min-width", FieldAttr::MinWidth),
    ("ellipsis", FieldAttr::Ellipsis),
    ("form-label-width", FieldAttr::FormLabelWidth),
    ("options", FieldAttr::Options),
    ("api", FieldAttr::Api),
    ("api-params", FieldAttr::ApiParams),
    ("depend", FieldAttr::Depend),
    ("label-key", FieldAttr::LabelKey),
    ("value-key", FieldAttr::ValueKey),
    ("api-method", FieldAttr::ApiMethod),
    ("loading-text", FieldAttr::LoadingText),
    ("empty-options-text", FieldAttr::EmptyOptionsText),
    ("search", FieldAttr::Search),
    ("op", FieldAttr::Op),
    ("search-default", FieldAttr::SearchDefault),
    ("search-placeholder", FieldAttr::SearchPlaceholder),
    ("multiple", FieldAttr::Multiple),
    ("rules", FieldAttr::Rules),
    ("path", FieldAttr::Path),
    ("path-item", FieldAttr::PathItem),
    ("mode", FieldAttr::Mode),
    ("formatter", FieldAttr::Formatter),
];

pub static FIELD_ATTRIBUTE_INDEX: LazyLock<HashMap<&'static str, FieldAttr>> =
    LazyLock::new(|| FIELD_ATTRIBUTES.iter().copied().collect());

/// Attributes of `ModelGlobalConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalAttr {
    Model,
    Actions,
    ActionWidth,
    ActionItemCondition,
    ActionLabel,
    ActionIcon,
    ActionClass,
    ActionPermission,
    ActionApi,
    ActionMethod,
    ActionCallback,
    SearchDefaultCount,
}

impl GlobalAttr {
    /// Button-keyed map packed as `btn=value;btn=value`.
    pub fn is_action_map(self) -> bool {
        matches!(
            self,
            GlobalAttr::ActionItemCondition
                | GlobalAttr::ActionLabel
                | GlobalAttr::ActionIcon
                | GlobalAttr::ActionClass
                | GlobalAttr::ActionPermission
                | GlobalAttr::ActionApi
                | GlobalAttr::ActionMethod
                | GlobalAttr::ActionCallback
        )
    }
}

/// Hyphenated tag key → model attribute.
pub const GLOBAL_ATTRIBUTES: &[(&str, GlobalAttr)] = &[
    ("model", GlobalAttr::Model),
    ("actions", GlobalAttr::Actions),
    ("action-width", GlobalAttr::ActionWidth),
    ("action-item-condition", GlobalAttr::ActionItemCondition),
    ("action-label", GlobalAttr::ActionLabel),
    ("action-icon", GlobalAttr::ActionIcon),
    ("action-class", GlobalAttr::ActionClass),
    ("action-permission", GlobalAttr::ActionPermission),
    ("action-api", GlobalAttr::ActionApi),
    ("action-method", GlobalAttr::ActionMethod),
    ("action-callback", GlobalAttr::ActionCallback),
    ("search-default-count", GlobalAttr::SearchDefaultCount),
];

pub static GLOBAL_ATTRIBUTE_INDEX: LazyLock<HashMap<&'static str, GlobalAttr>> =
    LazyLock::new(|| GLOBAL_ATTRIBUTES.iter().copied().collect());

/// Default caption for a built-in button.
pub fn builtin_button_label(token: &str) -> Option<&'static str> {
    match token {
        "view" => Some("查看"),
        "edit" => Some("编辑"),
        "delete" => Some("删除"),
        "add" => Some("新增"),
        _ => None,
    }
}
