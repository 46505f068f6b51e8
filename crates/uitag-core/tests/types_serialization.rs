use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uitag_core::protocol::{ApiResponse, GetListParams, RecordId};
use uitag_core::*;

fn keys(value: &Value) -> Vec<&str> {
    value
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect()
}

#[test]
fn field_config_json_keys() {
    let field = FieldConfig {
        label: Some("状态".into()),
        component_type: Some("USelect".into()),
        search_span: Some(TagValue::Number(8.0)),
        path_item: Some("name".into()),
        empty_options_text: Some("无".into()),
        ..Default::default()
    };

    let json = serde_json::to_value(&field).unwrap();
    let obj = json.as_object().unwrap();

    assert!(obj.contains_key("label"));
    assert!(obj.contains_key("type")); // renamed from component_type
    assert!(obj.contains_key("searchSpan"));
    assert!(obj.contains_key("pathItem"));
    assert!(obj.contains_key("emptyOptionsText"));

    // Unset attributes are absent, never null
    assert!(!obj.contains_key("sort"));
    assert!(!obj.contains_key("hidden"));
    assert!(!obj.contains_key("component_type"));
    assert!(!obj.contains_key("apiParams"));
    assert_eq!(obj.len(), 5);
}

#[test]
fn field_config_scalars_stay_untagged() {
    let field = FieldConfig {
        default: Some(TagValue::String("{{ formData.type }}".into())),
        disabled: Some(TagValue::Bool(true)),
        width: Some(TagValue::Number(120.0)),
        api_params: Some(ApiParams::Map(IndexMap::from([(
            "parentId".to_string(),
            "{{ formData.dept }}".to_string(),
        )]))),
        ..Default::default()
    };

    let json = serde_json::to_value(&field).unwrap();
    assert_eq!(
        json,
        json!({
            "default": "{{ formData.type }}",
            "disabled": true,
            "width": 120.0,
            "apiParams": {"parentId": "{{ formData.dept }}"},
        })
    );

    let back: FieldConfig = serde_json::from_value(json).unwrap();
    assert_eq!(back, field);
}

#[test]
fn model_global_config_json_keys() {
    let config = assemble(
        "sysuser",
        &[RawTagField::new(
            "UIConfig",
            "actions:view,custom:Audit;action-permission:Audit=sysuser:audit",
        )],
    );

    let json = serde_json::to_value(&config.global).unwrap();
    assert_eq!(
        keys(&json),
        vec![
            "actionPermission",
            "actionWidth",
            "actions",
            "model",
            "searchDefaultCount"
        ]
    );
    assert_eq!(json["actions"], json!(["view", "custom:Audit"]));
    assert_eq!(json["actionPermission"], json!({"Audit": "sysuser:audit"}));
}

#[test]
fn parsed_config_keeps_field_order() {
    let config = assemble(
        "m",
        &[
            RawTagField::new("zeta", "label:Z"),
            RawTagField::new("alpha", "label:A"),
            RawTagField::new("mid", "label:M"),
        ],
    );
    let text = serde_json::to_string(&config).unwrap();
    let at = |name: &str| text.find(&format!("\"{name}\":")).unwrap();
    assert!(at("zeta") < at("alpha") && at("alpha") < at("mid"));

    let back: ParsedUIConfig = serde_json::from_str(&text).unwrap();
    let names: Vec<&str> = back.fields.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    assert_eq!(back, config);
}

#[test]
fn display_value_is_kind_tagged() {
    let cases = [
        (DisplayValue::text("--"), json!({"kind": "text", "text": "--"})),
        (
            DisplayValue::Image {
                src: "/a.png".into(),
                width: 40,
                height: 40,
            },
            json!({"kind": "image", "src": "/a.png", "width": 40, "height": 40}),
        ),
        (
            DisplayValue::AvatarGroup {
                items: vec!["a".into()],
            },
            json!({"kind": "avatar-group", "items": ["a"]}),
        ),
        (
            DisplayValue::Link {
                href: "/sysuser/detail/7".into(),
                text: "7".into(),
            },
            json!({"kind": "link", "href": "/sysuser/detail/7", "text": "7"}),
        ),
    ];
    for (value, expected) in cases {
        assert_eq!(serde_json::to_value(&value).unwrap(), expected);
    }
}

#[test]
fn button_action_json_keys() {
    let config = assemble(
        "sysuser",
        &[RawTagField::new("UIConfig", "actions:view")],
    );
    let action = ButtonAction::from_global(&config.global, &"view".into());
    let json = serde_json::to_value(&action).unwrap();
    assert_eq!(json, json!({"id": "view", "label": "查看", "method": "POST"}));
}

#[test]
fn diagnostic_json_shape() {
    let result = validate(&assemble(
        "sysuser",
        &[RawTagField::new("price", "formatter:money")],
    ));
    let json = serde_json::to_value(&result.errors[0]).unwrap();
    assert_eq!(json["code"], "UIT-E004");
    assert_eq!(json["severity"], "error");
    assert_eq!(json["model"], "sysuser");
    assert_eq!(json["field"], "price");

    let tag_result = validate_tags("sysuser", &[RawTagField::new("UIConfig", "theme:dark")]);
    let json = serde_json::to_value(&tag_result.warnings[0]).unwrap();
    assert_eq!(json["severity"], "warning");
    assert!(!json.as_object().unwrap().contains_key("field"));
}

#[test]
fn raw_rows_deserialize_from_backend_payload() {
    let payload = json!([
        {"field": "UIConfig", "tag": "actions:view"},
        {"field": "name", "tag": "label:名称;required"}
    ]);
    let rows: Vec<RawTagField> = serde_json::from_value(payload).unwrap();
    assert_eq!(rows[1], RawTagField::new("name", "label:名称;required"));
}

#[test]
fn api_envelope_shapes() {
    let ok: ApiResponse<Vec<RawTagField>> =
        serde_json::from_str(r#"{"code":0,"msg":"ok","data":[{"field":"a","tag":"label:A"}]}"#)
            .unwrap();
    assert!(ok.is_success());
    assert_eq!(ok.data.len(), 1);

    // `data` may be omitted on failures
    let failed: ApiResponse<Vec<RawTagField>> =
        serde_json::from_str(r#"{"code":500,"msg":"boom"}"#).unwrap();
    assert!(!failed.is_success());
    assert!(failed.data.is_empty());

    let ids: Vec<RecordId> = serde_json::from_value(json!([1, "a-2"])).unwrap();
    assert_eq!(ids, vec![RecordId::Int(1), RecordId::from("a-2")]);

    let params = serde_json::to_value(GetListParams::new("sysuser")).unwrap();
    assert_eq!(params, json!({"model_name": "sysuser", "page": 1, "page_size": 10}));
}
