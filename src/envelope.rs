//! # Request and Response Envelopes
//!
//! Transport-neutral request/response types shared by the router, handlers and
//! middleware. The Worker entry point converts to and from `worker` types at the
//! edge so the dispatch pipeline can run without a JavaScript host.
//!
//! Every JSON body produced here is either a handler payload or the error shape
//! `{"error": <string>, "details"?: <string>}`.

use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::constants::CONTENT_TYPE_JSON;

/// Inbound request as seen by the dispatcher.
#[derive(Clone, Debug)]
pub struct GatewayRequest {
    pub method: Method,
    /// URL path only, without query string.
    pub path: String,
    pub body: Vec<u8>,
}

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Parses the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Outbound response before conversion to the host response type.
#[derive(Clone, Debug)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl GatewayResponse {
    /// Serializes `value` as the JSON body.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::raw(status, CONTENT_TYPE_JSON, body),
            Err(e) => Self::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
                Some(&format!("failed to serialize response: {e}")),
            ),
        }
    }

    pub fn error(status: StatusCode, error: &str, details: Option<&str>) -> Self {
        let body = match details {
            Some(details) => json!({ "error": error, "details": details }),
            None => json!({ "error": error }),
        };
        Self::raw(status, CONTENT_TYPE_JSON, body.to_string().into_bytes())
    }

    /// Raw bytes with an explicit content type, used for stored assets.
    pub fn raw(status: StatusCode, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body,
        }
    }

    /// Empty body, no content type.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Sets a header, replacing any existing value with the same name.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}
