pub mod catalogs;
pub mod error;
pub mod expression;
pub mod ffi;
pub mod formatter;
pub mod parser;
pub mod permissions;
pub mod presentation;
pub mod protocol;
pub mod relation;
pub mod resolver;
pub mod settings;
pub mod store;
pub mod types;
pub mod validator;
pub mod value;

pub use catalogs::UI_CONFIG_FIELD;
pub use error::{UiError, UiResult};
pub use expression::{evaluate_condition, evaluate_template, Expr, ExprError, Scope};
pub use ffi::{assemble_to_json, parse_tag_to_json, validate_to_json};
pub use formatter::{Formatter, FormatterKind, FormatterSpec};
pub use parser::parse_tag;
pub use permissions::{
    filter_authorized, is_authorized, is_shown, visible_buttons, ButtonAction, PermissionSet,
};
pub use protocol::{ApiClient, ApiRequest, ApiResponse, Transport};
pub use relation::DisplayValue;
pub use resolver::{assemble, resolve_field, resolve_global};
pub use settings::RenderSettings;
pub use store::{ConfigStore, PermissionSource, PermissionStore, TagSource};
pub use types::*;
pub use validator::{validate, validate_tags};
