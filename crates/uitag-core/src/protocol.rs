//! Backend wire protocol: the `{code, data, msg}` envelope, request bodies
//! and a transport-agnostic client for the fixed endpoints.

use std::fmt;

use indexmap::IndexMap;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{UiError, UiResult};
use crate::permissions::PermissionSet;
use crate::store::{PermissionSource, TagSource};
use crate::types::{HttpMethod, RawTagField};
use crate::value::to_display_string;

pub const PATH_GET_UI_TAG: &str = "/getuitag";
pub const PATH_GET_LIST: &str = "/getlist";
pub const PATH_ADD: &str = "/add";
pub const PATH_EDIT: &str = "/edit";
pub const PATH_DELETE: &str = "/del";
pub const PATH_GET_PERMISSIONS: &str = "/getpermissions";

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Every response: `code == 0` is success, anything else a failure whose
/// `msg` is meant for the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub data: T,
    #[serde(default)]
    pub msg: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 0,
            data,
            msg: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Keep the whole envelope, failing on a non-zero code.
    pub fn checked(self) -> UiResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(UiError::Protocol {
                code: self.code,
                msg: self.msg,
            })
        }
    }

    pub fn into_result(self) -> UiResult<T> {
        self.checked().map(|r| r.data)
    }
}

/// Decode a response body and validate its envelope. The code is checked
/// before `data` is typed, so failure envelopes carrying `"data": null` (or
/// any other shape) still surface the server's `msg`. A `null` payload on
/// success becomes `T::default()`.
pub fn decode_envelope<T: DeserializeOwned + Default>(body: &str) -> UiResult<ApiResponse<T>> {
    let raw = serde_json::from_str::<ApiResponse<Value>>(body)?.checked()?;
    let data = match raw.data {
        Value::Null => T::default(),
        data => serde_json::from_value(data)?,
    };
    Ok(ApiResponse {
        code: raw.code,
        data,
        msg: raw.msg,
    })
}

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Primary key: numeric or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{n}"),
            RecordId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Str(s.to_string())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        RecordId::Str(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetListParams {
    pub model_name: String,
    pub page: u32,
    pub page_size: u32,
    /// `<field>_asc` or `<field>_desc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Map<String, Value>>,
}

impl GetListParams {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model_name: model.into(),
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            sort: None,
            filters: None,
        }
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn sort_by(mut self, field: &str, descending: bool) -> Self {
        let dir = if descending { "desc" } else { "asc" };
        self.sort = Some(format!("{field}_{dir}"));
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters
            .get_or_insert_with(Map::new)
            .insert(field.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddDataParams {
    pub model_name: String,
    pub data: Map<String, Value>,
}

/// The key travels beside `data`, never inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditDataParams {
    pub model_name: String,
    pub id: RecordId,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteDataParams {
    pub model_name: String,
    pub ids: Vec<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage<T> {
    pub list: Vec<T>,
    pub total: u64,
}

impl<T> Default for ListPage<T> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            total: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicOption {
    pub value: RecordId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One HTTP exchange, described independently of any HTTP library.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    /// Unencoded pairs; the transport encodes them.
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// GET sends `params` as query pairs, POST as a JSON object body.
    pub fn with_params<'a>(
        method: HttpMethod,
        path: impl Into<String>,
        params: impl IntoIterator<Item = (&'a String, &'a Value)>,
    ) -> Self {
        match method {
            HttpMethod::Get => Self {
                query: params
                    .into_iter()
                    .map(|(k, v)| (k.clone(), to_display_string(v)))
                    .collect(),
                ..Self::get(path)
            },
            HttpMethod::Post => Self::post(
                path,
                Value::Object(
                    params
                        .into_iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                ),
            ),
        }
    }
}

/// Performs a request and returns the raw response body. Failures below
/// the envelope (connection, status, timeouts) are `UiError::Transport`.
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> UiResult<String>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &ApiRequest) -> UiResult<String> {
        (**self).send(request)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn call<R: DeserializeOwned + Default>(&self, request: ApiRequest) -> UiResult<ApiResponse<R>> {
        debug!("{} {}", request.method.as_str(), request.path);
        let body = self.transport.send(&request)?;
        decode_envelope(&body)
    }

    fn post_json<B: Serialize, R: DeserializeOwned + Default>(
        &self,
        path: &str,
        body: &B,
    ) -> UiResult<ApiResponse<R>> {
        self.call(ApiRequest::post(path, serde_json::to_value(body)?))
    }

    pub fn get_ui_tags(&self, model: &str) -> UiResult<Vec<RawTagField>> {
        let mut request = ApiRequest::get(PATH_GET_UI_TAG);
        request.query.push(("model_name".into(), model.to_string()));
        self.call(request)?.into_result()
    }

    pub fn get_list<R: DeserializeOwned>(&self, params: &GetListParams) -> UiResult<ListPage<R>> {
        self.post_json(PATH_GET_LIST, params)?.into_result()
    }

    pub fn add(&self, model: &str, data: Map<String, Value>) -> UiResult<ApiResponse<Value>> {
        self.post_json(
            PATH_ADD,
            &AddDataParams {
                model_name: model.to_string(),
                data,
            },
        )
    }

    pub fn edit(
        &self,
        model: &str,
        id: RecordId,
        data: Map<String, Value>,
    ) -> UiResult<ApiResponse<Value>> {
        self.post_json(
            PATH_EDIT,
            &EditDataParams {
                model_name: model.to_string(),
                id,
                data,
            },
        )
    }

    pub fn delete(&self, model: &str, ids: Vec<RecordId>) -> UiResult<ApiResponse<Value>> {
        self.post_json(
            PATH_DELETE,
            &DeleteDataParams {
                model_name: model.to_string(),
                ids,
            },
        )
    }

    pub fn get_permissions(&self) -> UiResult<PermissionSet> {
        self.call(ApiRequest::get(PATH_GET_PERMISSIONS))?
            .into_result()
    }

    /// Options for a select-like field from its configured endpoint.
    pub fn dynamic_options(
        &self,
        path: &str,
        params: &IndexMap<String, Value>,
        method: HttpMethod,
    ) -> UiResult<Vec<DynamicOption>> {
        self.call(ApiRequest::with_params(method, path, params))?
            .into_result()
    }

    /// Custom button endpoint; the full envelope is returned so callers can
    /// show `msg` on success.
    pub fn custom_action(
        &self,
        path: &str,
        data: &Map<String, Value>,
        method: HttpMethod,
    ) -> UiResult<ApiResponse<Value>> {
        self.call(ApiRequest::with_params(method, path, data))
    }
}

impl<T: Transport> TagSource for ApiClient<T> {
    fn fetch_tags(&self, model: &str) -> UiResult<Vec<RawTagField>> {
        self.get_ui_tags(model)
    }
}

impl<T: Transport> PermissionSource for ApiClient<T> {
    fn fetch_permissions(&self) -> UiResult<PermissionSet> {
        self.get_permissions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replies with a canned body per path and records every request.
    struct Canned {
        replies: Vec<(&'static str, String)>,
        seen: Mutex<Vec<ApiRequest>>,
    }

    impl Canned {
        fn new(replies: Vec<(&'static str, Value)>) -> Self {
            Self {
                replies: replies
                    .into_iter()
                    .map(|(p, v)| (p, v.to_string()))
                    .collect(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn last(&self) -> ApiRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for Canned {
        fn send(&self, request: &ApiRequest) -> UiResult<String> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .iter()
                .find(|(p, _)| *p == request.path)
                .map(|(_, body)| body.clone())
                .ok_or_else(|| UiError::transport(format!("no route {}", request.path)))
        }
    }

    #[test]
    fn envelope_checks_code() {
        let ok: ApiResponse<Vec<String>> =
            serde_json::from_str(r#"{"code":0,"data":["a"],"msg":""}"#).unwrap();
        assert_eq!(ok.into_result().unwrap(), vec!["a".to_string()]);

        let err = decode_envelope::<Value>(r#"{"code":401,"msg":"未登录"}"#).unwrap_err();
        assert!(matches!(err, UiError::Protocol { code: 401, ref msg } if msg == "未登录"));
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = decode_envelope::<Value>("<html>").unwrap_err();
        assert!(matches!(err, UiError::Decode(_)));
    }

    #[test]
    fn get_ui_tags_sends_model_query() {
        let t = Canned::new(vec![(
            PATH_GET_UI_TAG,
            json!({"code": 0, "data": [{"field": "UIConfig", "tag": "actions:view"}], "msg": ""}),
        )]);
        let client = ApiClient::new(&t);
        let rows = client.get_ui_tags("sysuser").unwrap();
        assert_eq!(rows, vec![RawTagField::new("UIConfig", "actions:view")]);
        let req = t.last();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.query, vec![("model_name".to_string(), "sysuser".to_string())]);
    }

    #[test]
    fn get_list_posts_params() {
        let t = Canned::new(vec![(
            PATH_GET_LIST,
            json!({"code": 0, "data": {"list": [{"id": 1}], "total": 31}, "msg": ""}),
        )]);
        let client = ApiClient::new(&t);
        let params = GetListParams::new("sysuser")
            .page(2, 20)
            .sort_by("created_at", true)
            .filter("status", json!(1));
        let page: ListPage<Value> = client.get_list(&params).unwrap();
        assert_eq!(page.total, 31);
        assert_eq!(
            t.last().body,
            Some(json!({
                "model_name": "sysuser",
                "page": 2,
                "page_size": 20,
                "sort": "created_at_desc",
                "filters": {"status": 1}
            }))
        );
    }

    #[test]
    fn list_params_omit_unset_fields() {
        let body = serde_json::to_value(GetListParams::new("m")).unwrap();
        assert_eq!(body, json!({"model_name": "m", "page": 1, "page_size": 10}));
    }

    #[test]
    fn edit_keeps_id_outside_data() {
        let t = Canned::new(vec![(PATH_EDIT, json!({"code": 0, "data": null, "msg": "已保存"}))]);
        let client = ApiClient::new(&t);
        let mut data = Map::new();
        data.insert("name".into(), json!("bob"));
        let res = client.edit("sysuser", RecordId::from(7), data).unwrap();
        assert_eq!(res.msg, "已保存");
        assert_eq!(
            t.last().body,
            Some(json!({"model_name": "sysuser", "id": 7, "data": {"name": "bob"}}))
        );
    }

    #[test]
    fn delete_sends_ids() {
        let t = Canned::new(vec![(PATH_DELETE, json!({"code": 0, "msg": "ok"}))]);
        let client = ApiClient::new(&t);
        client
            .delete("sysuser", vec![RecordId::from(1), RecordId::from("u-2")])
            .unwrap();
        assert_eq!(
            t.last().body,
            Some(json!({"model_name": "sysuser", "ids": [1, "u-2"]}))
        );
    }

    #[test]
    fn dynamic_options_get_uses_query() {
        let t = Canned::new(vec![(
            "/api/depts",
            json!({"code": 0, "data": [{"value": 1, "label": "Tech"}, {"value": "x", "label": "Ops", "disabled": true}], "msg": ""}),
        )]);
        let client = ApiClient::new(&t);
        let mut params = IndexMap::new();
        params.insert("parent".to_string(), json!(3));
        let options = client
            .dynamic_options("/api/depts", &params, HttpMethod::Get)
            .unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].disabled, Some(true));
        let req = t.last();
        assert_eq!(req.query, vec![("parent".to_string(), "3".to_string())]);
        assert_eq!(req.body, None);
    }

    #[test]
    fn custom_action_post_uses_body() {
        let t = Canned::new(vec![("/api/v1/user/audit", json!({"code": 0, "msg": "审核成功"}))]);
        let client = ApiClient::new(&t);
        let mut data = Map::new();
        data.insert("id".into(), json!(9));
        let res = client
            .custom_action("/api/v1/user/audit", &data, HttpMethod::Post)
            .unwrap();
        assert_eq!(res.msg, "审核成功");
        let req = t.last();
        assert_eq!(req.body, Some(json!({"id": 9})));
        assert!(req.query.is_empty());
    }

    #[test]
    fn protocol_failure_surfaces_message() {
        let t = Canned::new(vec![(PATH_ADD, json!({"code": 500, "msg": "用户名已存在"}))]);
        let client = ApiClient::new(&t);
        let err = client.add("sysuser", Map::new()).unwrap_err();
        assert_eq!(err.user_message(), "用户名已存在");
    }

    #[test]
    fn failure_with_null_data_keeps_server_message() {
        let t = Canned::new(vec![(
            PATH_GET_UI_TAG,
            json!({"code": 404, "data": null, "msg": "模型不存在"}),
        )]);
        let client = ApiClient::new(&t);
        let err = client.get_ui_tags("ghost").unwrap_err();
        assert!(matches!(err, UiError::Protocol { code: 404, .. }));
        assert_eq!(err.user_message(), "模型不存在");

        let t = Canned::new(vec![(
            PATH_GET_PERMISSIONS,
            json!({"code": 401, "data": null, "msg": "未登录"}),
        )]);
        let err = ApiClient::new(&t).get_permissions().unwrap_err();
        assert_eq!(err.user_message(), "未登录");
    }

    #[test]
    fn success_with_null_data_is_default() {
        let t = Canned::new(vec![(
            PATH_GET_UI_TAG,
            json!({"code": 0, "data": null, "msg": ""}),
        )]);
        let rows = ApiClient::new(&t).get_ui_tags("empty").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn mistyped_success_data_is_decode_error() {
        let err = decode_envelope::<Vec<String>>(r#"{"code":0,"data":{"a":1}}"#).unwrap_err();
        assert!(matches!(err, UiError::Decode(_)));
    }

    #[test]
    fn transport_failure_is_generic() {
        let t = Canned::new(vec![]);
        let client = ApiClient::new(&t);
        let err = client.get_permissions().unwrap_err();
        assert!(matches!(err, UiError::Transport(_)));
    }
}
