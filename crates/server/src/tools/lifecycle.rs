//! sw_install, sw_activate and sw_open_client tool implementations.
//!
//! The MCP client plays the host runtime: it decides when to fire install
//! and activate, and which pages are open.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use appshell_core::Error;

use crate::agent::{ServiceWorker, WorkerState};

/// Parameters for sw_open_client.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OpenClientParams {
    /// Identifier of the page being opened or reloaded.
    pub client_id: String,

    /// Close the page instead of opening it.
    #[serde(default)]
    pub close: bool,
}

/// Output from sw_open_client.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OpenClientOutput {
    pub client_id: String,
    /// Whether the agent now controls this page.
    pub controlled: bool,
    pub state: WorkerState,
}

fn to_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::Serialization(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;
    to_result(&report)
}

pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    to_result(&report)
}

pub async fn open_client_impl(worker: &ServiceWorker, params: OpenClientParams) -> Result<CallToolResult, McpError> {
    let client_id = params.client_id.trim();
    if client_id.is_empty() {
        return Err(Error::InvalidInput("client_id must not be empty".into()).into());
    }

    let controlled = if params.close {
        worker.close_client(client_id);
        false
    } else {
        worker.open_client(client_id)
    };

    to_result(&OpenClientOutput { client_id: client_id.to_string(), controlled, state: worker.state() })
}
