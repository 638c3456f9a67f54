//! The offline-caching agent.
//!
//! A [`ServiceWorker`] owns one store version (its cache name) and reacts to
//! three host events:
//!
//! - `install`: create and populate the versioned store ([`lifecycle`])
//! - `activate`: delete every other store, claim open clients ([`lifecycle`])
//! - `fetch`: classify and serve one request ([`router`])
//!
//! Storage and network are trait objects so hosts and tests can swap them.

pub mod events;
pub mod lifecycle;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use router::RoutingTable;

use appshell_client::{Network, resolve};
use appshell_core::{AppConfig, CacheStorage, ConfigError, Request, Response};
use tokio::task::JoinHandle;
use url::Url;

pub use events::{FetchEvent, FetchOutcome, ResponseSource, Route, WorkerState};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lifecycle switches trading transition safety for fast rollout.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleOptions {
    pub skip_waiting: bool,
    pub claim_clients: bool,
}

/// One deployed version of the agent.
pub struct ServiceWorker {
    cache_name: String,
    routing: RoutingTable,
    options: LifecycleOptions,
    offline_fallback: Option<Url>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    state: Mutex<WorkerState>,
    /// Open clients, and whether this agent controls each.
    clients: Mutex<BTreeMap<String, bool>>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl ServiceWorker {
    pub fn new(
        config: &AppConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
    ) -> Result<Self, ConfigError> {
        let routing = RoutingTable::from_config(config)?;
        let offline_fallback = config
            .offline_fallback
            .as_deref()
            .map(|path| {
                resolve(routing.origin(), path).map_err(|e| ConfigError::Invalid {
                    field: "offline_fallback".into(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            cache_name: config.cache_name(),
            routing,
            options: LifecycleOptions { skip_waiting: config.skip_waiting, claim_clients: config.claim_clients },
            offline_fallback,
            storage,
            network,
            state: Mutex::new(WorkerState::Parsed),
            clients: Mutex::new(BTreeMap::new()),
            pending_writes: Mutex::new(Vec::new()),
        })
    }

    /// The current store version identifier.
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn state(&self) -> WorkerState {
        *lock(&self.state)
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn options(&self) -> LifecycleOptions {
        self.options
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub(crate) fn offline_fallback(&self) -> Option<&Url> {
        self.offline_fallback.as_ref()
    }

    /// Register (or reload) a client page.
    ///
    /// A page loaded while this agent is active is controlled by it; a page
    /// opened earlier stays uncontrolled until claimed or reloaded.
    pub fn open_client(&self, id: &str) -> bool {
        let controlled = self.state().can_intercept_fetch();
        lock(&self.clients).insert(id.to_string(), controlled);
        tracing::debug!(client = id, controlled, "client opened");
        controlled
    }

    pub fn close_client(&self, id: &str) {
        lock(&self.clients).remove(id);
    }

    /// Number of open clients this agent does not control.
    pub fn uncontrolled_clients(&self) -> usize {
        lock(&self.clients).values().filter(|controlled| !**controlled).count()
    }

    /// Take control of every open client; returns how many changed hands.
    pub(crate) fn claim_clients(&self) -> usize {
        let mut clients = lock(&self.clients);
        let mut claimed = 0;
        for controlled in clients.values_mut().filter(|c| !**c) {
            *controlled = true;
            claimed += 1;
        }
        claimed
    }

    /// Whether fetches from this client are routed by the agent.
    ///
    /// `None` stands for a fresh navigation, which an active agent always
    /// handles.
    pub fn is_controlling(&self, client_id: Option<&str>) -> bool {
        if !self.state().can_intercept_fetch() {
            return false;
        }
        match client_id {
            None => true,
            Some(id) => lock(&self.clients).get(id).copied().unwrap_or(false),
        }
    }

    /// Write to the current store in the background.
    ///
    /// The caller's response never waits on, or fails because of, this write.
    pub(crate) fn spawn_store_write(&self, request: Request, response: Response) {
        let storage = Arc::clone(&self.storage);
        let cache_name = self.cache_name.clone();
        let handle = tokio::spawn(async move {
            match storage.put(&cache_name, &request, response).await {
                Ok(()) => tracing::debug!(cache = %cache_name, url = %request.url, "stored response"),
                Err(e) => tracing::warn!(cache = %cache_name, url = %request.url, error = %e, "store write failed"),
            }
        });

        let mut pending = lock(&self.pending_writes);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every background store write started so far.
    pub async fn wait_until_settled(&self) {
        let pending = std::mem::take(&mut *lock(&self.pending_writes));
        for handle in pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "store write task failed");
            }
        }
    }
}
