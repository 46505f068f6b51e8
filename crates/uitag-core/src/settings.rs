use serde::{Deserialize, Serialize};

/// Presentation constants used by the renderer. Every field has a default,
/// so a partial YAML/JSON document deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderSettings {
    /// Shown for null, missing and empty values.
    pub placeholder: String,
    /// Joins items in `flat` relation mode.
    pub flat_separator: String,
    /// Suffix after the item count in `count` relation mode.
    pub count_unit: String,
    /// Detail route for `link` relation mode; `{model}` and `{id}` are substituted.
    pub link_route: String,
    /// Offset applied to epoch timestamps before formatting.
    pub utc_offset_minutes: i32,
    /// Weekday names for the `WW` token, Sunday first.
    pub weekday_names: [String; 7],
    pub image_width: u32,
    pub image_height: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            placeholder: "--".into(),
            flat_separator: "，".into(),
            count_unit: "个".into(),
            link_route: "/{model}/detail/{id}".into(),
            utc_offset_minutes: 0,
            weekday_names: ["日", "一", "二", "三", "四", "五", "六"].map(String::from),
            image_width: 40,
            image_height: 40,
        }
    }
}

impl RenderSettings {
    pub fn link_href(&self, model: &str, id: &str) -> String {
        self.link_route
            .replace("{model}", model)
            .replace("{id}", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let s: RenderSettings = serde_json::from_str(r#"{"placeholder": "-"}"#).unwrap();
        assert_eq!(s.placeholder, "-");
        assert_eq!(s.count_unit, "个");
        assert_eq!(s.image_width, 40);
    }

    #[test]
    fn link_href_substitutes_route() {
        let s = RenderSettings::default();
        assert_eq!(s.link_href("sysuser", "7"), "/sysuser/detail/7");
    }
}
