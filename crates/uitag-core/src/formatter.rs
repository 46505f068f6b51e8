//! Display formatting of raw row values.
//!
//! A formatter spec is `<type>[:<params>]`, split on the first colon so
//! patterns such as `datetime:YYYY-MM-DD HH:mm` keep their own colons.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, Timelike, Utc,
};
use log::debug;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::relation::DisplayValue;
use crate::settings::RenderSettings;
use crate::value::{self, number_to_string};

pub const DEFAULT_DATE_PATTERN: &str = "YYYY-MM-DD";
pub const DEFAULT_DATETIME_PATTERN: &str = "YYYY-MM-DD HH:mm:ss";
pub const DEFAULT_CURRENCY_DECIMALS: usize = 2;
pub const DEFAULT_PERCENT_DECIMALS: usize = 1;
const MAX_DECIMALS: usize = 20;

static RE_DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"YYYY|MM|DD|HH|mm|ss|WW").unwrap());

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];
const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

// ---------------------------------------------------------------------------
// Spec parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatterKind {
    Date,
    Datetime,
    Currency,
    Percent,
    Img,
    Custom,
    Unknown(String),
}

impl FormatterKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "date" => FormatterKind::Date,
            "datetime" => FormatterKind::Datetime,
            "currency" => FormatterKind::Currency,
            "percent" => FormatterKind::Percent,
            "img" => FormatterKind::Img,
            "custom" => FormatterKind::Custom,
            other => FormatterKind::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterSpec {
    pub kind: FormatterKind,
    pub params: Option<String>,
}

impl FormatterSpec {
    /// `None` for a blank spec.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }
        let (name, params) = match spec.split_once(':') {
            Some((name, params)) => (name.trim(), Some(params.trim())),
            None => (spec, None),
        };
        Some(FormatterSpec {
            kind: FormatterKind::parse(name),
            params: params.filter(|p| !p.is_empty()).map(str::to_string),
        })
    }
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

pub type CustomFormatter = Box<dyn Fn(&Value) -> String + Send + Sync>;

/// Render settings plus the registry behind `custom:<name>` specs.
pub struct Formatter {
    pub(crate) settings: RenderSettings,
    custom: HashMap<String, CustomFormatter>,
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("Formatter")
            .field("settings", &self.settings)
            .field("custom", &names)
            .finish()
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

impl Formatter {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            custom: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Value) -> String + Send + Sync + 'static,
    ) {
        self.custom.insert(name.into(), Box::new(f));
    }

    pub fn with_custom(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Value) -> String + Send + Sync + 'static,
    ) -> Self {
        self.register(name, f);
        self
    }

    pub fn has_custom(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    pub fn placeholder(&self) -> DisplayValue {
        DisplayValue::text(&self.settings.placeholder)
    }

    /// Format one value. Null, missing and `""` always give the placeholder.
    pub fn format_value(&self, value: Option<&Value>, spec: Option<&str>) -> DisplayValue {
        let Some(value) = value.filter(|v| !value::is_blank(Some(v))) else {
            return self.placeholder();
        };
        let Some(spec) = spec.and_then(FormatterSpec::parse) else {
            return DisplayValue::text(value::to_display_string(value));
        };
        let params = spec.params.as_deref();

        match spec.kind {
            FormatterKind::Date => {
                self.format_date(value, params.unwrap_or(DEFAULT_DATE_PATTERN))
            }
            FormatterKind::Datetime => {
                self.format_date(value, params.unwrap_or(DEFAULT_DATETIME_PATTERN))
            }
            FormatterKind::Currency => match value::to_number(value).filter(|n| n.is_finite()) {
                Some(n) => DisplayValue::text(group_thousands(
                    n,
                    decimals(params, DEFAULT_CURRENCY_DECIMALS),
                )),
                None => self.placeholder(),
            },
            FormatterKind::Percent => match value::to_number(value).filter(|n| n.is_finite()) {
                Some(n) => {
                    let d = decimals(params, DEFAULT_PERCENT_DECIMALS);
                    DisplayValue::text(format!("{:.*}%", d, n * 100.0))
                }
                None => self.placeholder(),
            },
            FormatterKind::Img => {
                let (width, height) = image_size(
                    params,
                    self.settings.image_width,
                    self.settings.image_height,
                );
                DisplayValue::Image {
                    src: value::to_display_string(value),
                    width,
                    height,
                }
            }
            FormatterKind::Custom => {
                let text = match params.and_then(|name| self.custom.get(name)) {
                    Some(f) => f(value),
                    None => {
                        debug!("custom formatter {params:?} not registered");
                        value::to_display_string(value)
                    }
                };
                DisplayValue::text(text)
            }
            FormatterKind::Unknown(name) => {
                debug!("unknown formatter type {name:?}");
                DisplayValue::text(value::to_display_string(value))
            }
        }
    }

    fn format_date(&self, value: &Value, pattern: &str) -> DisplayValue {
        if !value::is_truthy(value) {
            return self.placeholder();
        }
        match to_local_datetime(value, self.offset()) {
            Some(dt) => DisplayValue::text(render_date_pattern(
                &dt,
                pattern,
                &self.settings.weekday_names,
            )),
            None => self.placeholder(),
        }
    }

    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.settings.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decimals(params: Option<&str>, default: usize) -> usize {
    params
        .and_then(value::parse_number)
        .filter(|n| *n >= 0.0)
        .map_or(default, |n| (n.trunc() as usize).min(MAX_DECIMALS))
}

fn image_size(params: Option<&str>, default_w: u32, default_h: u32) -> (u32, u32) {
    let Some(params) = params else {
        return (default_w, default_h);
    };
    let mut parts = params.split('x').map(|p| p.trim().parse::<u32>().ok());
    let width = parts.next().flatten().unwrap_or(default_w);
    let height = parts.next().flatten().unwrap_or(default_h);
    (width, height)
}

/// `1234567.891` with 2 decimals → `1,234,567.89`.
pub fn group_thousands(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if n < 0.0 {
        grouped.push('-');
    }
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

/// Wall-clock time for a timestamp or date string. Ten-digit epoch values
/// are seconds, other numbers milliseconds; epochs and zoned strings are
/// shifted to `offset`, naive strings are taken as-is.
fn to_local_datetime(value: &Value, offset: FixedOffset) -> Option<NaiveDateTime> {
    match value {
        Value::Number(n) => epoch_to_local(n.as_f64()?, offset),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                return epoch_to_local(s.parse().ok()?, offset);
            }
            parse_date_string(s, offset)
        }
        _ => None,
    }
}

fn epoch_to_local(n: f64, offset: FixedOffset) -> Option<NaiveDateTime> {
    if !n.is_finite() {
        return None;
    }
    let millis = if number_to_string(n).len() == 10 {
        n * 1000.0
    } else {
        n
    };
    DateTime::from_timestamp_millis(millis.trunc() as i64)
        .map(|utc| utc.with_timezone(&offset).naive_local())
}

fn parse_date_string(s: &str, offset: FixedOffset) -> Option<NaiveDateTime> {
    if let Ok(zoned) = DateTime::parse_from_rfc3339(s) {
        return Some(zoned.with_timezone(&offset).naive_local());
    }
    if let Some(dt) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(dt);
    }
    NAIVE_DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Substitute every `YYYY MM DD HH mm ss WW` token in `pattern`.
pub fn render_date_pattern(dt: &NaiveDateTime, pattern: &str, weekdays: &[String; 7]) -> String {
    RE_DATE_TOKEN
        .replace_all(pattern, |caps: &Captures| match &caps[0] {
            "YYYY" => dt.year().to_string(),
            "MM" => format!("{:02}", dt.month()),
            "DD" => format!("{:02}", dt.day()),
            "HH" => format!("{:02}", dt.hour()),
            "mm" => format!("{:02}", dt.minute()),
            "ss" => format!("{:02}", dt.second()),
            _ => weekdays[dt.weekday().num_days_from_sunday() as usize].clone(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn text(f: &Formatter, v: Value, spec: &str) -> String {
        match f.format_value(Some(&v), Some(spec)) {
            DisplayValue::Text { text } => text,
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn spec_splits_on_first_colon() {
        let spec = FormatterSpec::parse("datetime:YYYY-MM-DD HH:mm").unwrap();
        assert_eq!(spec.kind, FormatterKind::Datetime);
        assert_eq!(spec.params.as_deref(), Some("YYYY-MM-DD HH:mm"));
        assert_eq!(FormatterSpec::parse("  "), None);
        assert_eq!(
            FormatterSpec::parse("currency:").unwrap().params,
            None
        );
    }

    #[test]
    fn blank_values_render_placeholder() {
        let f = Formatter::default();
        for v in [json!(null), json!("")] {
            assert_eq!(f.format_value(Some(&v), Some("currency")), DisplayValue::text("--"));
        }
        assert_eq!(f.format_value(None, Some("date")), DisplayValue::text("--"));
        assert_eq!(f.format_value(None, None), DisplayValue::text("--"));
    }

    #[test]
    fn currency_groups_thousands() {
        let f = Formatter::default();
        assert_eq!(text(&f, json!(1234.5), "currency"), "1,234.50");
        assert_eq!(text(&f, json!(1234567.891), "currency:1"), "1,234,567.9");
        assert_eq!(text(&f, json!("-999"), "currency:0"), "-999");
        assert_eq!(text(&f, json!(-1000), "currency"), "-1,000.00");
        assert_eq!(text(&f, json!(12), "currency:abc"), "12.00");
    }

    #[test]
    fn currency_non_numeric_is_placeholder() {
        let f = Formatter::default();
        assert_eq!(text(&f, json!("abc"), "currency"), "--");
        assert_eq!(text(&f, json!({"a": 1}), "percent"), "--");
    }

    #[test]
    fn percent_defaults_to_one_decimal() {
        let f = Formatter::default();
        assert_eq!(text(&f, json!(0.256), "percent"), "25.6%");
        assert_eq!(text(&f, json!(0.5), "percent:0"), "50%");
        assert_eq!(text(&f, json!("0.1234"), "percent:2"), "12.34%");
    }

    #[test]
    fn date_from_string_and_epoch() {
        let f = Formatter::default();
        assert_eq!(text(&f, json!("2024-03-05 08:09:10"), "date"), "2024-03-05");
        assert_eq!(
            text(&f, json!("2024-03-05T08:09:10Z"), "datetime"),
            "2024-03-05 08:09:10"
        );
        // 2023-11-14 22:13:20 UTC, once in seconds and once in milliseconds
        assert_eq!(text(&f, json!(1700000000), "datetime"), "2023-11-14 22:13:20");
        assert_eq!(text(&f, json!(1700000000000i64), "datetime"), "2023-11-14 22:13:20");
    }

    #[test]
    fn date_pattern_replaces_every_token() {
        let f = Formatter::default();
        assert_eq!(
            text(&f, json!("2024-03-05"), "date:YYYY/MM/DD 周WW (MM)"),
            "2024/03/05 周二 (03)"
        );
    }

    #[test]
    fn date_respects_utc_offset() {
        let f = Formatter::new(RenderSettings {
            utc_offset_minutes: 480,
            ..RenderSettings::default()
        });
        assert_eq!(text(&f, json!(1700000000), "datetime"), "2023-11-15 06:13:20");
        // naive strings are already wall time
        assert_eq!(text(&f, json!("2024-01-01 00:00:00"), "datetime"), "2024-01-01 00:00:00");
    }

    #[test]
    fn invalid_or_falsy_dates_are_placeholder() {
        let f = Formatter::default();
        assert_eq!(text(&f, json!("not a date"), "date"), "--");
        assert_eq!(text(&f, json!(0), "date"), "--");
    }

    #[test]
    fn img_uses_default_and_custom_size() {
        let f = Formatter::default();
        let v = json!("/a.png");
        assert_eq!(
            f.format_value(Some(&v), Some("img")),
            DisplayValue::Image {
                src: "/a.png".into(),
                width: 40,
                height: 40
            }
        );
        assert_eq!(
            f.format_value(Some(&v), Some("img:64x32")),
            DisplayValue::Image {
                src: "/a.png".into(),
                width: 64,
                height: 32
            }
        );
    }

    #[test]
    fn custom_formatter_registry() {
        let f = Formatter::default().with_custom("yesNo", |v| {
            if value::is_truthy(v) { "是" } else { "否" }.to_string()
        });
        assert_eq!(text(&f, json!(true), "custom:yesNo"), "是");
        assert_eq!(text(&f, json!(false), "custom:yesNo"), "否");
        assert_eq!(text(&f, json!(7), "custom:missing"), "7");
        assert_eq!(text(&f, json!(7), "custom"), "7");
        assert!(f.has_custom("yesNo"));
        assert!(!f.has_custom("missing"));
    }

    #[test]
    fn unknown_type_and_no_spec_stringify() {
        let f = Formatter::default();
        assert_eq!(text(&f, json!(42), "money"), "42");
        let v = json!({"a": 1});
        assert_eq!(f.format_value(Some(&v), None), DisplayValue::text(r#"{"a":1}"#));
    }
}
