//! Host events and their results.

use appshell_core::{Request, Response};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifecycle state of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Loaded, not yet installed.
    Parsed,
    Installing,
    /// Store populated, waiting for activation.
    Installed,
    Activating,
    /// Controlling clients and routing requests.
    Activated,
    /// Install failed or was abandoned; the host may retry.
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Policy chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Non-GET: left to the host's default transport.
    NotIntercepted,
    NetworkFirst,
    CacheFirst,
    PassThrough,
}

/// Where a returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// The configured offline page, served in place of a main document.
    OfflineFallback,
    /// Produced locally (503 for unreachable pinned assets).
    Synthetic,
}

/// An intercepted network request.
#[derive(Debug, Clone)]
pub struct FetchEvent {
    pub request: Request,
    /// Page the request came from; `None` for a fresh navigation.
    pub client_id: Option<String>,
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self { request, client_id: None }
    }

    pub fn from_client(request: Request, client_id: impl Into<String>) -> Self {
        Self { request, client_id: Some(client_id.into()) }
    }
}

/// What the agent tells the host to do with a fetch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not handled; the host uses its default transport.
    NotIntercepted,
    /// Respond with this response.
    Respond { route: Route, source: ResponseSource, response: Response },
    /// Handled, but nothing to respond with; the host surfaces its
    /// default "no connection" condition.
    Unavailable { route: Route, reason: String },
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Respond { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Respond { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn route(&self) -> Route {
        match self {
            FetchOutcome::NotIntercepted => Route::NotIntercepted,
            FetchOutcome::Respond { route, .. } | FetchOutcome::Unavailable { route, .. } => *route,
        }
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    pub cache_name: String,
    /// Number of pinned assets written.
    pub entries: usize,
    /// Whether the host should activate right away.
    pub skip_waiting: bool,
    pub installed_at: String,
}

/// Result of a successful activation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateReport {
    pub cache_name: String,
    /// Stale stores removed.
    pub deleted: Vec<String>,
    /// Stale stores that could not be removed.
    pub failed: Vec<String>,
    /// Open clients taken over.
    pub claimed_clients: usize,
    pub activated_at: String,
}
