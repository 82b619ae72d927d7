//! Turns a catalog entry plus user-entered values into a concrete request.
//!
//! Nothing here validates values against the catalog: missing required
//! parameters, malformed JSON bodies and over-long tag lists are all sent
//! as-is and left for the server to reject.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::catalog::{EndpointDescriptor, HttpMethod, ParamType};

/// A file picked for a `file` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub path: PathBuf,
    pub file_name: String,
}

impl FileRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Self { path, file_name }
    }
}

/// A value entered for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    File(FileRef),
}

impl ParamValue {
    /// Parse raw user input according to the parameter's declared type.
    pub fn parse(kind: ParamType, raw: &str) -> Result<Self> {
        match kind {
            ParamType::Number => {
                if let Ok(i) = raw.trim().parse::<i64>() {
                    return Ok(Self::Number(i.into()));
                }
                let f: f64 = raw.trim().parse().map_err(|_| anyhow!("`{raw}` is not a number"))?;
                serde_json::Number::from_f64(f)
                    .map(Self::Number)
                    .ok_or_else(|| anyhow!("`{raw}` is not a finite number"))
            }
            ParamType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Self::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Self::Bool(false)),
                other => bail!("`{other}` is not a boolean (expected true/false)"),
            },
            ParamType::File => Ok(Self::File(FileRef::new(raw))),
            ParamType::Text | ParamType::Url | ParamType::Select => Ok(Self::Text(raw.to_string())),
        }
    }

    /// Empty text counts as "not entered".
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Text(s) if s.is_empty())
    }

    /// The string form used in paths, query strings and form fields.
    pub fn to_param_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::File(f) => f.file_name.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::File(f) => serde_json::Value::String(f.file_name.clone()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self { Self::Text(s.to_string()) }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self { Self::Number(n.into()) }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self { Self::Bool(b) }
}

pub type RequestParams = BTreeMap<String, ParamValue>;

/// A free-form key/value row (custom header or form field).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    #[default]
    Json,
    Form,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(FileRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    #[default]
    None,
    /// Raw editor text, sent untouched.
    Json(String),
    Multipart(Vec<FormPart>),
}

/// Method, headers and body for a request, before the URL is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl BuiltRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.header("Authorization").and_then(|v| v.strip_prefix("Bearer "))
    }

    pub fn json_body(&self) -> Option<&str> {
        match &self.body {
            RequestBody::Json(s) => Some(s),
            _ => None,
        }
    }
}

/// Substitute path placeholders and append the remaining declared parameters
/// as a query string, in catalog order.
pub fn build_url(base_url: &str, endpoint: &EndpointDescriptor, params: &RequestParams) -> String {
    let mut path = endpoint.path.to_string();
    for (key, value) in params {
        let placeholder = format!("{{{key}}}");
        if path.contains(&placeholder) {
            path = path.replace(&placeholder, &value.to_param_string());
        }
    }

    let pairs: Vec<(&str, String)> = endpoint
        .parameters
        .iter()
        .filter(|p| p.kind != ParamType::File && !endpoint.is_path_param(p.name))
        .filter_map(|p| {
            params
                .get(p.name)
                .filter(|v| v.is_present())
                .map(|v| (p.name, v.to_param_string()))
        })
        .collect();

    let url = format!("{}{}", base_url.trim_end_matches('/'), path);
    if pairs.is_empty() {
        return url;
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{url}?{query}")
}

fn set_header(headers: &mut Vec<(String, String)>, key: &str, value: String) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
        Some(slot) => *slot = (key.to_string(), value),
        None => headers.push((key.to_string(), value)),
    }
}

/// Method, auth header, custom headers and body for `endpoint`.
#[allow(clippy::too_many_arguments)]
pub fn build_request_options(
    endpoint: &EndpointDescriptor,
    params: &RequestParams,
    token: Option<&str>,
    custom_headers: &[KeyValue],
    body: &str,
    body_format: BodyFormat,
    form_fields: &[KeyValue],
) -> RequestOptions {
    let mut headers = Vec::new();

    if endpoint.requires_auth {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            set_header(&mut headers, "Authorization", format!("Bearer {token}"));
        }
    }

    for h in custom_headers.iter().filter(|h| !h.key.is_empty() && !h.value.is_empty()) {
        set_header(&mut headers, &h.key, h.value.clone());
    }

    let body = if !endpoint.has_body {
        RequestBody::None
    } else if body_format == BodyFormat::Json {
        set_header(&mut headers, "Content-Type", "application/json".to_string());
        RequestBody::Json(body.to_string())
    } else if endpoint.method == HttpMethod::Post && endpoint.id == "upload" {
        RequestBody::Multipart(upload_parts(endpoint, params))
    } else {
        let parts = form_fields
            .iter()
            .filter(|f| !f.key.is_empty())
            .map(|f| FormPart { name: f.key.clone(), value: FormValue::Text(f.value.clone()) })
            .collect();
        RequestBody::Multipart(parts)
    };

    RequestOptions { method: endpoint.method, headers, body }
}

fn upload_parts(endpoint: &EndpointDescriptor, params: &RequestParams) -> Vec<FormPart> {
    endpoint
        .parameters
        .iter()
        .filter_map(|p| {
            let value = params.get(p.name).filter(|v| v.is_present())?;
            let value = match (p.kind, value) {
                (_, ParamValue::File(f)) => FormValue::File(f.clone()),
                (ParamType::Boolean, ParamValue::Bool(b)) => FormValue::Text(if *b { "1" } else { "0" }.to_string()),
                (_, v) => FormValue::Text(v.to_param_string()),
            };
            Some(FormPart { name: p.name.to_string(), value })
        })
        .collect()
}

/// Full request: URL from [`build_url`], the rest from [`build_request_options`].
#[allow(clippy::too_many_arguments)]
pub fn build_request(
    base_url: &str,
    endpoint: &EndpointDescriptor,
    params: &RequestParams,
    token: Option<&str>,
    custom_headers: &[KeyValue],
    body: &str,
    body_format: BodyFormat,
    form_fields: &[KeyValue],
) -> BuiltRequest {
    let url = build_url(base_url, endpoint, params);
    let opts = build_request_options(endpoint, params, token, custom_headers, body, body_format, form_fields);
    BuiltRequest { method: opts.method, url, headers: opts.headers, body: opts.body }
}
