//! In-process doubles for the network and the store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use appshell_client::{Network, NetworkError, is_same_origin};
use appshell_core::{AppConfig, CacheStorage, Error, Request, Response, ResponseType, StoreDb, StoredEntry};
use async_trait::async_trait;
use url::Url;

use super::{ServiceWorker, lock};

pub const ORIGIN: &str = "https://site.example";

pub fn test_config(precache: &[&str]) -> AppConfig {
    AppConfig {
        cache_prefix: "site-cache".into(),
        version: "v2".into(),
        origin: ORIGIN.into(),
        precache: precache.iter().map(|p| p.to_string()).collect(),
        db_path: ":memory:".into(),
        ..AppConfig::default()
    }
}

pub fn ok_response(body: &str) -> Response {
    Response::new(200, ResponseType::Basic, body.to_string()).with_header("content-type", "text/plain")
}

/// Scripted network. Unscripted URLs answer 200 with the URL as body.
pub struct FakeNetwork {
    origin: Url,
    responses: Mutex<HashMap<String, Response>>,
    hanging: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Url::parse(ORIGIN).unwrap(),
            responses: Mutex::new(HashMap::new()),
            hanging: Mutex::new(HashSet::new()),
            offline: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn respond(&self, url: &str, response: Response) {
        lock(&self.responses).insert(normalize(url), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Requests to this URL never complete.
    pub fn hang_on(&self, url: &str) {
        lock(&self.hanging).insert(normalize(url));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn normalize(url: &str) -> String {
    Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = request.url.to_string();

        let hangs = lock(&self.hanging).contains(&key);
        if hangs {
            std::future::pending::<()>().await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Connect("offline".into()));
        }

        let scripted = lock(&self.responses).get(&key).cloned();
        Ok(scripted.unwrap_or_else(|| {
            let response_type =
                if is_same_origin(&self.origin, &request.url) { ResponseType::Basic } else { ResponseType::Opaque };
            Response::new(200, response_type, key)
        }))
    }
}

/// A real in-memory store with switchable write and delete failures.
pub struct FaultyStorage {
    inner: StoreDb,
    fail_puts: AtomicBool,
    fail_deletes: Mutex<HashSet<String>>,
    hanging_deletes: Mutex<HashSet<String>>,
}

impl FaultyStorage {
    pub async fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: StoreDb::open_in_memory().await.unwrap(),
            fail_puts: AtomicBool::new(false),
            fail_deletes: Mutex::new(HashSet::new()),
            hanging_deletes: Mutex::new(HashSet::new()),
        })
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, name: &str) {
        lock(&self.fail_deletes).insert(name.to_string());
    }

    /// Deleting this store never completes.
    pub fn hang_delete(&self, name: &str) {
        lock(&self.hanging_deletes).insert(name.to_string());
    }

    pub fn inner(&self) -> &StoreDb {
        &self.inner
    }
}

#[async_trait]
impl CacheStorage for FaultyStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.inner.open(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.inner.has(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let hangs = lock(&self.hanging_deletes).contains(name);
        if hangs {
            std::future::pending::<()>().await;
        }
        let fails = lock(&self.fail_deletes).contains(name);
        if fails {
            return Err(Error::StoreDeletionFailed(format!("{name}: injected failure")));
        }
        self.inner.delete(name).await
    }

    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_request(name, request).await
    }

    async fn put(&self, name: &str, request: &Request, response: Response) -> Result<(), Error> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::InvalidInput("quota exceeded".into()));
        }
        self.inner.put(name, request, response).await
    }

    async fn entries(&self, name: &str) -> Result<Vec<StoredEntry>, Error> {
        self.inner.entries(name).await
    }
}

/// An installed and activated worker over fresh doubles.
pub async fn activated_worker(precache: &[&str]) -> (ServiceWorker, Arc<FakeNetwork>, Arc<StoreDb>) {
    let network = FakeNetwork::new();
    let storage = Arc::new(StoreDb::open_in_memory().await.unwrap());
    let worker = ServiceWorker::new(&test_config(precache), storage.clone(), network.clone()).unwrap();
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    (worker, network, storage)
}
