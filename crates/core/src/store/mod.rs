//! Versioned response stores backed by SQLite.
//!
//! A single database holds any number of named stores; each store maps
//! request keys (SHA-256 of method and URL) to whole responses. Stores are
//! created on open, overwritten per key, and only ever removed as a whole.
//!
//! The router and lifecycle manager talk to storage through the
//! [`CacheStorage`] trait so tests can inject faults.

pub mod connection;
pub mod entries;
pub mod key;
pub mod schema;
pub mod stores;

pub use crate::Error;

pub use connection::StoreDb;
pub use entries::StoredEntry;
pub use key::{compute_request_key, request_key};

use crate::http::{Request, Response};

/// Key-value store API: named stores of request → response.
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store by name, creating it if absent.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Whether a store with this name exists.
    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// All store names.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a store by name; false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Exact-key lookup in one store.
    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Write (or overwrite) the response for a request.
    async fn put(&self, name: &str, request: &Request, response: Response) -> Result<(), Error>;

    /// Entry summaries of one store.
    async fn entries(&self, name: &str) -> Result<Vec<StoredEntry>, Error>;
}

#[async_trait::async_trait]
impl CacheStorage for StoreDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        if self.open_store(name).await? {
            tracing::debug!(store = name, "created store");
        }
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.has_store(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.store_names().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_store(name).await
    }

    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.match_entry(name, request).await
    }

    async fn put(&self, name: &str, request: &Request, response: Response) -> Result<(), Error> {
        self.put_entry(name, request, response).await
    }

    async fn entries(&self, name: &str) -> Result<Vec<StoredEntry>, Error> {
        self.list_entries(name).await
    }
}
