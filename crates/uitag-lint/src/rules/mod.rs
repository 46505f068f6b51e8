//! Built-in lint rules.

pub mod custom_button_endpoint;
pub mod custom_button_permission;
pub mod duplicate_label;
pub mod form_size;
pub mod missing_label;
pub mod relation_config;

pub use custom_button_endpoint::CustomButtonEndpointRule;
pub use custom_button_permission::CustomButtonPermissionRule;
pub use duplicate_label::DuplicateLabelRule;
pub use form_size::FormSizeRule;
pub use missing_label::MissingLabelRule;
pub use relation_config::RelationConfigRule;
