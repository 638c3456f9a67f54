//! cache_list tool implementation.
//!
//! Lists every store with its entries, marking the current version.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use appshell_core::{CacheStorage, Error, StoredEntry};

/// One store in the cache_list output.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    /// Whether this is the agent's current version.
    pub current: bool,
    pub entry_count: usize,
    pub entries: Vec<StoredEntry>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub current: String,
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(storage: &dyn CacheStorage, current: &str) -> Result<CallToolResult, McpError> {
    let mut stores = Vec::new();
    for name in storage.keys().await? {
        let entries = storage.entries(&name).await?;
        stores.push(StoreSummary { current: name == current, entry_count: entries.len(), entries, name });
    }

    let output = CacheListOutput { current: current.to_string(), stores };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::Serialization(format!("Failed to serialize store list: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
