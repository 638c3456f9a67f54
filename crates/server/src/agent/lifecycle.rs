//! Store lifecycle: install populates the versioned store, activate retires
//! every other store and takes control of clients.
//!
//! Both transitions are guarded: if the future is dropped or returns an
//! error before committing, the state falls back (`redundant` after a
//! failed install, `installed` after a failed activation), so an abandoned
//! transition never leaves the new store current.

use std::sync::Mutex;

use appshell_core::{Error, Request, Response};
use futures_util::future::{join_all, try_join_all};

use super::ServiceWorker;
use super::events::{ActivateReport, InstallReport, WorkerState};
use super::lock;

/// An in-progress state transition that reverts unless committed.
struct Transition<'a> {
    state: &'a Mutex<WorkerState>,
    on_abort: WorkerState,
    committed: bool,
}

impl<'a> Transition<'a> {
    fn begin(
        state: &'a Mutex<WorkerState>, allowed: &[WorkerState], during: WorkerState, on_abort: WorkerState,
    ) -> Result<Self, Error> {
        let mut current = lock(state);
        if !allowed.contains(&*current) {
            return Err(Error::InvalidState(format!("cannot start {during} from {current}")));
        }
        *current = during;
        Ok(Self { state, on_abort, committed: false })
    }

    fn commit(mut self, to: WorkerState) {
        *lock(self.state) = to;
        self.committed = true;
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if !self.committed {
            *lock(self.state) = self.on_abort;
        }
    }
}

impl ServiceWorker {
    /// Create the current store and populate it with every pinned asset.
    ///
    /// All-or-nothing: any fetch failure or non-200 response fails the
    /// install with `PopulationFailed` and leaves the agent `redundant`.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let transition = Transition::begin(
            &self.state,
            &[WorkerState::Parsed, WorkerState::Installed, WorkerState::Redundant],
            WorkerState::Installing,
            WorkerState::Redundant,
        )?;
        let cache_name = self.cache_name();
        tracing::info!(cache = cache_name, "installing");

        self.storage().open(cache_name).await.inspect_err(|e| {
            tracing::error!(cache = cache_name, error = %e, "failed to open store");
        })?;

        let requests: Vec<Request> = self.routing().pinned_urls().iter().cloned().map(Request::get).collect();

        let responses = try_join_all(requests.iter().map(|request| self.fetch_pinned(request)))
            .await
            .inspect_err(|e| {
                tracing::error!(cache = cache_name, error = %e, "caching failed");
            })?;

        for (request, response) in requests.iter().zip(responses) {
            self.storage()
                .put(cache_name, request, response)
                .await
                .map_err(|e| Error::PopulationFailed(format!("{}: {e}", request.url)))
                .inspect_err(|e| {
                    tracing::error!(cache = cache_name, error = %e, "caching failed");
                })?;
        }

        transition.commit(WorkerState::Installed);
        tracing::info!(cache = cache_name, entries = requests.len(), "install complete");

        Ok(InstallReport {
            cache_name: cache_name.to_string(),
            entries: requests.len(),
            skip_waiting: self.options().skip_waiting,
            installed_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    async fn fetch_pinned(&self, request: &Request) -> Result<Response, Error> {
        let response = self
            .network()
            .fetch(request)
            .await
            .map_err(|e| Error::PopulationFailed(format!("{}: {e}", request.url)))?;

        if !response.is_cacheable() {
            return Err(Error::PopulationFailed(format!(
                "{}: status {} ({})",
                request.url, response.status, response.response_type
            )));
        }

        tracing::debug!(url = %request.url, bytes = response.body.len(), "fetched pinned asset");
        Ok(response)
    }

    /// Promote the current store: delete every other store, then take
    /// control of open clients.
    ///
    /// Deletions run independently; a failed deletion is reported, never
    /// fatal.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let transition = Transition::begin(
            &self.state,
            &[WorkerState::Installed],
            WorkerState::Activating,
            WorkerState::Installed,
        )?;
        let cache_name = self.cache_name();

        if !self.options().skip_waiting {
            let waiting = self.uncontrolled_clients();
            if waiting > 0 {
                tracing::info!(cache = cache_name, waiting, "activation waiting for open clients");
                return Err(Error::WaitingForClients(waiting));
            }
        }

        tracing::info!(cache = cache_name, "activating");

        let stale: Vec<String> = self
            .storage()
            .keys()
            .await?
            .into_iter()
            .filter(|name| name != cache_name)
            .collect();

        let results = join_all(stale.iter().map(|name| async move { (name, self.storage().delete(name).await) })).await;

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in results {
            match result {
                Ok(_) => {
                    tracing::info!(cache = %name, "deleted old store");
                    deleted.push(name.clone());
                }
                Err(e) => {
                    let err = Error::StoreDeletionFailed(format!("{name}: {e}"));
                    tracing::warn!(error = %err, "could not delete old store");
                    failed.push(name.clone());
                }
            }
        }

        transition.commit(WorkerState::Activated);

        let claimed_clients = if self.options().claim_clients { self.claim_clients() } else { 0 };
        tracing::info!(cache = cache_name, deleted = deleted.len(), claimed_clients, "activation complete");

        Ok(ActivateReport {
            cache_name: cache_name.to_string(),
            deleted,
            failed,
            claimed_clients,
            activated_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{FakeNetwork, FaultyStorage, ORIGIN, ok_response, test_config};
    use appshell_core::{CacheStorage, ResponseType, StoreDb};
    use std::sync::Arc;
    use std::time::Duration;

    async fn worker_with(precache: &[&str]) -> (ServiceWorker, Arc<FakeNetwork>, Arc<StoreDb>) {
        let network = FakeNetwork::new();
        let storage = Arc::new(StoreDb::open_in_memory().await.unwrap());
        let worker = ServiceWorker::new(&test_config(precache), storage.clone(), network.clone()).unwrap();
        (worker, network, storage)
    }

    #[tokio::test]
    async fn test_install_populates_store() {
        let (worker, _network, storage) = worker_with(&["/", "/index.html", "/icon.png"]).await;

        let report = worker.install().await.unwrap();
        assert_eq!(report.cache_name, "site-cache-v2");
        assert_eq!(report.entries, 3);
        assert!(report.skip_waiting);
        assert_eq!(worker.state(), WorkerState::Installed);
        assert_eq!(storage.entries("site-cache-v2").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_install_twice_is_idempotent() {
        let (worker, _network, storage) = worker_with(&["/", "/index.html", "/icon.png"]).await;

        worker.install().await.unwrap();
        let first: Vec<(String, u16)> = storage
            .entries("site-cache-v2")
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.url, e.status))
            .collect();

        worker.install().await.unwrap();
        let second: Vec<(String, u16)> = storage
            .entries("site-cache-v2")
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.url, e.status))
            .collect();

        assert_eq!(first, second);
        assert_eq!(storage.store_names().await.unwrap(), vec!["site-cache-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_install_fails_when_any_asset_fails() {
        let (worker, network, _storage) = worker_with(&["/", "/missing.png"]).await;
        network.respond(&format!("{ORIGIN}/missing.png"), Response::new(404, ResponseType::Basic, "nope"));

        let err = worker.install().await.unwrap_err();
        assert!(matches!(err, Error::PopulationFailed(msg) if msg.contains("missing.png")));
        assert_eq!(worker.state(), WorkerState::Redundant);

        let err = worker.activate().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_install_fails_offline_then_retries() {
        let (worker, network, storage) = worker_with(&["/", "/icon.png"]).await;
        network.set_offline(true);

        assert!(worker.install().await.is_err());
        assert_eq!(worker.state(), WorkerState::Redundant);

        network.set_offline(false);
        worker.install().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Installed);
        assert_eq!(storage.count_entries("site-cache-v2").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_install_fails_when_store_write_fails() {
        let network = FakeNetwork::new();
        let storage = FaultyStorage::new().await;
        storage.fail_puts(true);
        let worker = ServiceWorker::new(&test_config(&["/"]), storage.clone(), network).unwrap();

        let err = worker.install().await.unwrap_err();
        assert!(matches!(err, Error::PopulationFailed(_)));
        assert_eq!(worker.state(), WorkerState::Redundant);
    }

    #[tokio::test]
    async fn test_aborted_install_is_never_current() {
        let (worker, network, _storage) = worker_with(&["/", "/slow.png"]).await;
        network.hang_on(&format!("{ORIGIN}/slow.png"));

        let result = tokio::time::timeout(Duration::from_millis(20), worker.install()).await;
        assert!(result.is_err());
        assert_eq!(worker.state(), WorkerState::Redundant);
        assert!(matches!(worker.activate().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_aborted_activation_stays_installed() {
        let network = FakeNetwork::new();
        let storage = FaultyStorage::new().await;
        storage.inner().open_store("site-cache-v1").await.unwrap();
        storage.hang_delete("site-cache-v1");

        let worker = ServiceWorker::new(&test_config(&["/"]), storage.clone(), network.clone()).unwrap();
        worker.install().await.unwrap();

        let result = tokio::time::timeout(Duration::from_millis(20), worker.activate()).await;
        assert!(result.is_err());
        assert_eq!(worker.state(), WorkerState::Installed);
        assert!(storage.inner().has_store("site-cache-v1").await.unwrap());

        let calls = network.calls();
        let request = Request::get(url::Url::parse(&format!("{ORIGIN}/")).unwrap());
        let outcome = worker.handle_fetch(crate::agent::FetchEvent::new(request)).await;
        assert_eq!(outcome, crate::agent::FetchOutcome::NotIntercepted);
        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let (worker, _network, _storage) = worker_with(&["/"]).await;
        let err = worker.activate().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(worker.state(), WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_stores() {
        let (worker, _network, storage) = worker_with(&["/"]).await;
        storage.open_store("site-cache-v1").await.unwrap();
        storage.open_store("other-app-v9").await.unwrap();

        worker.install().await.unwrap();
        let report = worker.activate().await.unwrap();

        let mut deleted = report.deleted.clone();
        deleted.sort();
        assert_eq!(deleted, vec!["other-app-v9".to_string(), "site-cache-v1".to_string()]);
        assert!(report.failed.is_empty());
        assert_eq!(storage.store_names().await.unwrap(), vec!["site-cache-v2".to_string()]);
        assert_eq!(worker.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_isolates_deletion_failures() {
        let network = FakeNetwork::new();
        let storage = FaultyStorage::new().await;
        storage.inner().open_store("site-cache-v0").await.unwrap();
        storage.inner().open_store("site-cache-v1").await.unwrap();
        storage.fail_delete("site-cache-v0");

        let worker = ServiceWorker::new(&test_config(&["/"]), storage.clone(), network).unwrap();
        worker.install().await.unwrap();
        let report = worker.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["site-cache-v1".to_string()]);
        assert_eq!(report.failed, vec!["site-cache-v0".to_string()]);
        assert_eq!(worker.state(), WorkerState::Activated);
        assert!(!storage.inner().has_store("site-cache-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_activate_claims_open_clients() {
        let (worker, _network, _storage) = worker_with(&["/"]).await;
        assert!(!worker.open_client("tab-1"));
        assert!(!worker.open_client("tab-2"));

        worker.install().await.unwrap();
        let report = worker.activate().await.unwrap();
        assert_eq!(report.claimed_clients, 2);
        assert!(worker.is_controlling(Some("tab-1")));
    }

    #[tokio::test]
    async fn test_activate_waits_for_clients_without_skip_waiting() {
        let network = FakeNetwork::new();
        let storage = Arc::new(StoreDb::open_in_memory().await.unwrap());
        let config = appshell_core::AppConfig { skip_waiting: false, ..test_config(&["/"]) };
        let worker = ServiceWorker::new(&config, storage, network).unwrap();

        worker.open_client("tab-1");
        let report = worker.install().await.unwrap();
        assert!(!report.skip_waiting);

        let err = worker.activate().await.unwrap_err();
        assert!(matches!(err, Error::WaitingForClients(1)));
        assert_eq!(worker.state(), WorkerState::Installed);

        worker.close_client("tab-1");
        worker.activate().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_without_claim_leaves_clients_uncontrolled() {
        let network = FakeNetwork::new();
        let storage = Arc::new(StoreDb::open_in_memory().await.unwrap());
        let config = appshell_core::AppConfig { claim_clients: false, ..test_config(&["/"]) };
        let worker = ServiceWorker::new(&config, storage, network).unwrap();

        worker.open_client("tab-1");
        worker.install().await.unwrap();
        let report = worker.activate().await.unwrap();

        assert_eq!(report.claimed_clients, 0);
        assert!(!worker.is_controlling(Some("tab-1")));
        assert!(worker.open_client("tab-1"));
        assert!(worker.is_controlling(Some("tab-1")));
    }

    #[tokio::test]
    async fn test_install_writes_pinned_bodies() {
        let (worker, network, storage) = worker_with(&["/icon.png"]).await;
        network.respond(&format!("{ORIGIN}/icon.png"), ok_response("png-bytes"));

        worker.install().await.unwrap();
        let request = Request::get(url::Url::parse(&format!("{ORIGIN}/icon.png")).unwrap());
        let stored = storage.match_request("site-cache-v2", &request).await.unwrap().unwrap();
        assert_eq!(stored.body.as_ref(), b"png-bytes");
    }
}
