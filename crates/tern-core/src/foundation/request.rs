//! Request, response and call-context records.
//!
//! These are the values that flow through a single API call: the
//! [`ApiRequest`] built by the client facade, the [`ApiResponse`] returned by
//! the transport collaborator, and the [`CallContext`] that composers run
//! against.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP verb used to issue an API method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Parameters travel in the query string.
    #[default]
    Get,
    /// Parameters travel as a form body.
    Post,
}

impl HttpMethod {
    /// Returns the verb as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single API method call as seen by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Remote method name (e.g. `"users.get"`).
    pub method: String,
    /// Call parameters.
    pub params: Map<String, Value>,
    /// Verb used to carry the call.
    pub http_method: HttpMethod,
}

impl ApiRequest {
    /// Creates a GET request with no parameters.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Map::new(),
            http_method: HttpMethod::Get,
        }
    }

    /// Replaces the parameter map.
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Sets the HTTP verb.
    pub fn with_http_method(mut self, http_method: HttpMethod) -> Self {
        self.http_method = http_method;
        self
    }

    /// Inserts `key` only when the call site did not already provide it.
    pub fn param_or_insert(&mut self, key: &str, value: impl Into<Value>) {
        if !self.params.contains_key(key) {
            self.params.insert(key.to_string(), value.into());
        }
    }

    /// Renders the parameters as flat string pairs, the shape transports send.
    ///
    /// Strings are sent verbatim, `null` is dropped, arrays of scalars are
    /// comma-joined and anything else is sent as its JSON text.
    pub fn flat_params(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .filter_map(|(key, value)| flatten_value(value).map(|v| (key.clone(), v)))
            .collect()
    }
}

fn flatten_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => Some(
            items
                .iter()
                .filter_map(flatten_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

/// Body of a transport response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ResponseBody {
    /// Body decoded as JSON.
    Json(Value),
    /// Body that could not be decoded; kept verbatim.
    Text(String),
}

impl ResponseBody {
    /// Decodes `raw`, falling back to [`ResponseBody::Text`].
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(raw.to_string()),
        }
    }

    /// Returns the body as a JSON object, if it is one.
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Json(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Returns the body as text, re-serialising JSON bodies.
    pub fn raw(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

/// A completed round trip as reported by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: ResponseBody,
}

impl ApiResponse {
    /// Creates a `200 OK` response with a JSON body.
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: ResponseBody::Json(body),
        }
    }

    /// Creates a `200 OK` response with an undecoded text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: ResponseBody::Text(body.into()),
        }
    }

    /// Sets the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Looks up a header, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The context object the client facade runs composers against.
///
/// Middleware in the `api.request` composer may short-circuit the network
/// round trip by filling [`response`](Self::response) (classified as usual)
/// or [`payload`](Self::payload) (returned as is).
#[derive(Debug, Clone)]
pub struct CallContext {
    /// The outgoing request.
    pub request: ApiRequest,
    /// The transport response, once known.
    pub response: Option<ApiResponse>,
    /// The unwrapped success payload, once known.
    pub payload: Option<Value>,
    /// Scratch space shared by middleware.
    pub state: Map<String, Value>,
}

impl CallContext {
    /// Creates a context for `request`.
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            response: None,
            payload: None,
            state: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_params() {
        let params = json!({
            "user_ids": [1, 2, 3],
            "fields": "photo",
            "extended": true,
            "skip": null,
        });
        let request = ApiRequest::new("users.get").with_params(params.as_object().unwrap().clone());
        let mut flat = request.flat_params();
        flat.sort();
        assert_eq!(
            flat,
            vec![
                ("extended".to_string(), "1".to_string()),
                ("fields".to_string(), "photo".to_string()),
                ("user_ids".to_string(), "1,2,3".to_string()),
            ]
        );
    }

    #[test]
    fn test_param_or_insert_keeps_call_site_value() {
        let mut request = ApiRequest::new("users.get");
        request.params.insert("v".into(), json!("5.0"));
        request.param_or_insert("v", "5.199");
        request.param_or_insert("lang", "en");
        assert_eq!(request.params["v"], json!("5.0"));
        assert_eq!(request.params["lang"], json!("en"));
    }

    #[test]
    fn test_response_body_parse() {
        assert!(matches!(ResponseBody::parse("{\"a\":1}"), ResponseBody::Json(_)));
        assert_eq!(
            ResponseBody::parse("not json"),
            ResponseBody::Text("not json".to_string())
        );
        assert!(ResponseBody::parse("\"str\"").as_object().is_none());
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut response = ApiResponse::json(json!({}));
        response
            .headers
            .push(("Content-Type".into(), "application/json".into()));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("x-missing"), None);
    }
}
