//! sw_fetch tool implementation.
//!
//! Dispatches one request through the agent as a fetch event and reports
//! which policy handled it and what the page would receive.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use appshell_client::resolve;
use appshell_core::{Error, Request, ResponseType};

use crate::agent::{FetchEvent, FetchOutcome, ResponseSource, Route, ServiceWorker};

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Page issuing the request; omit for a fresh navigation.
    #[serde(default)]
    pub client_id: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// How the agent disposed of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Left to the host's default transport.
    NotIntercepted,
    Responded,
    /// Handled but nothing to serve; the host shows its offline error.
    Unavailable,
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    pub url: String,
    pub method: String,
    pub outcome: Disposition,
    pub route: Route,
    pub source: Option<ResponseSource>,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub response_type: Option<ResponseType>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: Option<String>,
    /// Why nothing could be served.
    pub reason: Option<String>,
}

pub async fn fetch_impl(worker: &ServiceWorker, params: FetchParams) -> Result<CallToolResult, McpError> {
    let method = params.method.trim();
    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(Error::InvalidInput(format!("invalid method: {:?}", params.method)).into());
    }

    let url = resolve(worker.routing().origin(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::new(method, url);

    let event = match params.client_id {
        Some(id) => FetchEvent::from_client(request.clone(), id),
        None => FetchEvent::new(request.clone()),
    };
    let outcome = worker.handle_fetch(event).await;

    let mut output = FetchOutput {
        url: request.url.to_string(),
        method: request.method.clone(),
        outcome: Disposition::NotIntercepted,
        route: outcome.route(),
        source: outcome.source(),
        status: None,
        status_text: None,
        response_type: None,
        headers: Vec::new(),
        body: None,
        reason: None,
    };

    match outcome {
        FetchOutcome::NotIntercepted => {}
        FetchOutcome::Respond { response, .. } => {
            output.outcome = Disposition::Responded;
            output.status = Some(response.status);
            output.status_text = Some(response.status_text);
            output.response_type = Some(response.response_type);
            output.body = Some(String::from_utf8_lossy(&response.body).into_owned());
            output.headers = response.headers;
        }
        FetchOutcome::Unavailable { reason, .. } => {
            output.outcome = Disposition::Unavailable;
            output.reason = Some(reason);
        }
    }

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::Serialization(format!("Failed to serialize fetch output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{ORIGIN, activated_worker, ok_response};

    fn params(url: &str) -> FetchParams {
        FetchParams { url: url.into(), method: default_method(), client_id: None }
    }

    fn output(result: &CallToolResult) -> FetchOutput {
        let text = result.content[0].as_text().unwrap().text.clone();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_relative_path_resolves_against_origin() {
        let (worker, network, _storage) = activated_worker(&["/", "/icon.png"]).await;
        network.respond(&format!("{ORIGIN}/index.html"), ok_response("hello"));

        let out = output(&fetch_impl(&worker, params("/index.html")).await.unwrap());
        assert_eq!(out.url, "https://site.example/index.html");
        assert_eq!(out.outcome, Disposition::Responded);
        assert_eq!(out.route, Route::NetworkFirst);
        assert_eq!(out.status, Some(200));
        assert_eq!(out.body.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_fetch_post_is_not_intercepted() {
        let (worker, _network, _storage) = activated_worker(&["/"]).await;
        let p = FetchParams { url: "/api/submit".into(), method: "post".into(), client_id: None };

        let out = output(&fetch_impl(&worker, p).await.unwrap());
        assert_eq!(out.method, "POST");
        assert_eq!(out.outcome, Disposition::NotIntercepted);
        assert!(out.status.is_none());
    }

    #[tokio::test]
    async fn test_fetch_offline_cached_icon() {
        let (worker, network, _storage) = activated_worker(&["/", "/icon.png"]).await;
        network.set_offline(true);

        let out = output(&fetch_impl(&worker, params("/icon.png")).await.unwrap());
        assert_eq!(out.route, Route::CacheFirst);
        assert_eq!(out.source, Some(ResponseSource::Cache));
    }

    #[tokio::test]
    async fn test_fetch_offline_uncached_navigation_is_unavailable() {
        let (worker, network, _storage) = activated_worker(&["/icon.png"]).await;
        network.set_offline(true);

        let out = output(&fetch_impl(&worker, params("/index.html")).await.unwrap());
        assert_eq!(out.outcome, Disposition::Unavailable);
        assert!(out.reason.unwrap().contains("offline"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_input() {
        let (worker, _network, _storage) = activated_worker(&["/"]).await;

        let err = fetch_impl(&worker, params("ftp://site.example/x")).await.unwrap_err();
        assert_eq!(err.code.0, -32003);

        let p = FetchParams { url: "/".into(), method: "GE T".into(), client_id: None };
        let err = fetch_impl(&worker, p).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
