//! cache_get tool implementation.
//!
//! Reads one entry from a store without going to the network.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use appshell_client::resolve;
use appshell_core::{CacheStorage, Error, Request, ResponseType};
use url::Url;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// Store to read; defaults to the current version.
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(
    storage: &dyn CacheStorage, origin: &Url, current: &str, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let url = resolve(origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let store = params.store.unwrap_or_else(|| current.to_string());
    let request = Request::get(url);

    let response = storage
        .match_request(&store, &request)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} in {store}", request.url)))?;

    let output = CacheGetOutput {
        url: request.url.to_string(),
        store,
        status: response.status,
        status_text: response.status_text,
        response_type: response.response_type,
        body: String::from_utf8_lossy(&response.body).into_owned(),
        headers: response.headers,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::Serialization(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
