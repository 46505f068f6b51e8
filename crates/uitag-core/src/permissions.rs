//! Button authorization and visibility.
//!
//! Authorization is fail-closed for custom buttons without an explicit
//! permission mapping. Visibility conditions are fail-open.

use std::borrow::Cow;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalogs::builtin_button_label;
use crate::expression::evaluate_condition;
use crate::types::{ActionMap, ButtonId, HttpMethod, ModelGlobalConfig, ParsedUIConfig};

/// Permission identifiers granted to the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(Vec<String>);

impl PermissionSet {
    pub fn new(permissions: Vec<String>) -> Self {
        Self(permissions)
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.0.iter().any(|p| p == permission)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(String::from).collect())
    }
}

/// Permission a button requires. An explicit mapping always wins; an
/// unmapped custom button requires nothing that can be granted (`None`);
/// anything else defaults to `<model lowercased>:<button>`.
pub fn required_permission<'a>(
    button: &'a ButtonId,
    model: &str,
    action_permission: Option<&'a ActionMap>,
) -> Option<Cow<'a, str>> {
    if let Some(mapped) = action_permission.and_then(|m| m.get(button.bare_name())) {
        return Some(Cow::Borrowed(mapped));
    }
    if button.is_custom() {
        return None;
    }
    Some(Cow::Owned(format!(
        "{}:{}",
        model.to_lowercase(),
        button.as_str()
    )))
}

pub fn is_authorized(
    permissions: &PermissionSet,
    button: &ButtonId,
    model: &str,
    action_permission: Option<&ActionMap>,
) -> bool {
    match required_permission(button, model, action_permission) {
        Some(required) => permissions.contains(&required),
        None => {
            warn!("{model}: custom button {button} has no action-permission entry, denied");
            false
        }
    }
}

/// Authorized subset of `buttons`, declaration order kept.
pub fn filter_authorized<'b>(
    permissions: &PermissionSet,
    buttons: &'b [ButtonId],
    model: &str,
    action_permission: Option<&ActionMap>,
) -> Vec<&'b ButtonId> {
    buttons
        .iter()
        .filter(|b| is_authorized(permissions, b, model, action_permission))
        .collect()
}

/// Row-level visibility. No condition map, no entry for the button, or an
/// empty condition all mean shown; evaluation failures also mean shown.
pub fn is_shown(
    button: &ButtonId,
    row: Option<&Value>,
    conditions: Option<&ActionMap>,
) -> bool {
    match conditions.and_then(|c| c.get(button.bare_name())) {
        Some(condition) => evaluate_condition(condition, row),
        None => true,
    }
}

/// A declared button with its per-button overrides looked up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonAction {
    pub id: ButtonId,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
}

impl ButtonAction {
    pub fn from_global(global: &ModelGlobalConfig, id: &ButtonId) -> Self {
        let name = id.bare_name();
        let lookup = |map: &Option<ActionMap>| map.as_ref().and_then(|m| m.get(name)).cloned();

        let label = lookup(&global.action_label)
            .or_else(|| builtin_button_label(id.as_str()).map(String::from))
            .unwrap_or_else(|| name.to_string());
        let method = lookup(&global.action_method)
            .and_then(|m| HttpMethod::parse(&m))
            .unwrap_or(HttpMethod::Post);

        ButtonAction {
            id: id.clone(),
            label,
            icon: lookup(&global.action_icon),
            class: lookup(&global.action_class),
            api: lookup(&global.action_api),
            method,
            callback: lookup(&global.action_callback),
        }
    }
}

/// Declared buttons the user may use on `row`: authorization first, then
/// the row condition.
pub fn visible_buttons(
    config: &ParsedUIConfig,
    permissions: &PermissionSet,
    row: Option<&Value>,
) -> Vec<ButtonAction> {
    let global = &config.global;
    filter_authorized(
        permissions,
        config.buttons(),
        &config.model,
        global.action_permission.as_ref(),
    )
    .into_iter()
    .filter(|b| is_shown(b, row, global.action_item_condition.as_ref()))
    .map(|b| ButtonAction::from_global(global, b))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::assemble;
    use crate::types::RawTagField;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn perms(list: &[&str]) -> PermissionSet {
        list.iter().copied().collect()
    }

    fn map(pairs: &[(&str, &str)]) -> ActionMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn builtin_button_uses_default_permission() {
        let p = perms(&["sysuser:view"]);
        assert!(is_authorized(&p, &"view".into(), "SysUser", None));
        assert!(!is_authorized(&p, &"edit".into(), "SysUser", None));
    }

    #[test]
    fn unmapped_custom_button_is_denied() {
        let p = perms(&["sysuser:custom:Audit", "sysuser:Audit", "Audit"]);
        assert!(!is_authorized(&p, &"custom:Audit".into(), "SysUser", None));
    }

    #[test]
    fn explicit_mapping_wins() {
        let p = perms(&["user:audit", "sysuser:view"]);
        let m = map(&[("Audit", "user:audit"), ("view", "user:read")]);
        assert!(is_authorized(&p, &"custom:Audit".into(), "SysUser", Some(&m)));
        assert!(!is_authorized(&p, &"view".into(), "SysUser", Some(&m)));
    }

    #[test]
    fn filter_keeps_declaration_order() {
        let p = perms(&["m:delete", "m:view"]);
        let buttons: Vec<ButtonId> = ["view", "edit", "delete"].map(ButtonId::new).to_vec();
        let out: Vec<&str> = filter_authorized(&p, &buttons, "M", None)
            .into_iter()
            .map(ButtonId::as_str)
            .collect();
        assert_eq!(out, vec!["view", "delete"]);
    }

    #[test]
    fn shown_without_condition() {
        assert!(is_shown(&"edit".into(), None, None));
        let c = map(&[("delete", "row.status === 0")]);
        assert!(is_shown(&"edit".into(), None, Some(&c)));
    }

    #[test]
    fn condition_is_evaluated_against_row() {
        let c = map(&[("Audit", "row.status === 0")]);
        let pending = json!({"status": 0});
        let done = json!({"status": 1});
        assert!(is_shown(&"custom:Audit".into(), Some(&pending), Some(&c)));
        assert!(!is_shown(&"custom:Audit".into(), Some(&done), Some(&c)));
    }

    #[test]
    fn broken_condition_shows_button() {
        let c = map(&[("edit", "row.a.b.c")]);
        assert!(is_shown(&"edit".into(), Some(&json!({})), Some(&c)));
    }

    #[test]
    fn visible_buttons_combines_checks_and_overrides() {
        let config = assemble(
            "SysUser",
            &[RawTagField::new(
                "UIConfig",
                "actions:view,edit,custom:Audit;\
                 action-permission:Audit=sysuser:audit;\
                 action-item-condition:Audit=row.status === 0;\
                 action-api:Audit=/api/v1/user/audit;\
                 action-method:Audit=get",
            )],
        );
        let p = perms(&["sysuser:view", "sysuser:audit"]);

        let shown = visible_buttons(&config, &p, Some(&json!({"status": 0})));
        assert_eq!(
            shown,
            vec![
                ButtonAction {
                    id: "view".into(),
                    label: "查看".into(),
                    icon: None,
                    class: None,
                    api: None,
                    method: HttpMethod::Post,
                    callback: None,
                },
                ButtonAction {
                    id: "custom:Audit".into(),
                    label: "Audit".into(),
                    icon: None,
                    class: None,
                    api: Some("/api/v1/user/audit".into()),
                    method: HttpMethod::Get,
                    callback: None,
                },
            ]
        );

        let hidden = visible_buttons(&config, &p, Some(&json!({"status": 1})));
        assert_eq!(hidden.len(), 1);
    }
}
