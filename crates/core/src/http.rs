//! Request and response descriptors shared by the store, the network
//! transport and the router.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Origin classification of a response.
///
/// Only `Basic` responses are eligible for storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    /// Cross-origin response that passed a CORS check.
    Cors,
    /// Cross-origin response without CORS headers.
    Opaque,
    /// Synthetic response produced locally.
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(ResponseType::Basic),
            "cors" => Some(ResponseType::Cors),
            "opaque" => Some(ResponseType::Opaque),
            "error" => Some(ResponseType::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Upper-case HTTP method.
    pub method: String,
    pub url: Url,
}

impl Request {
    pub fn new(method: &str, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method: method.to_ascii_uppercase(), url }
    }

    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// A whole response: status line, headers and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, response_type: ResponseType, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: canonical_reason(status).to_string(),
            response_type,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Synthetic 503 returned when a pinned asset cannot be reached.
    pub fn service_unavailable() -> Self {
        Response::new(503, ResponseType::Error, "Service Unavailable").with_header("content-type", "text/plain")
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// A 200 same-origin response; anything else must never be stored.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }
}

fn canonical_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}
