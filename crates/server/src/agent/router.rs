//! Request routing: classification and the three fetch policies.
//!
//! Classification, first match wins:
//! 1. non-GET → not intercepted
//! 2. same-origin main document path → network-first
//! 3. same-origin pinned path (exact, or suffix for anything but `/`) → cache-first
//! 4. everything else → pass-through
//!
//! Only 200 same-origin responses are ever written to the store.

use appshell_client::{is_same_origin, resolve};
use appshell_core::{AppConfig, ConfigError, Error, Request, Response};
use url::Url;

use super::ServiceWorker;
use super::events::{FetchEvent, FetchOutcome, ResponseSource, Route};

/// Static routing data derived from configuration.
///
/// Paths are kept in their resolved (percent-encoded) form so they compare
/// equal to `Url::path()` of incoming requests.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    origin: Url,
    navigation: Vec<String>,
    pinned_urls: Vec<Url>,
}

fn resolve_paths(origin: &Url, field: &str, paths: &[String]) -> Result<Vec<Url>, ConfigError> {
    paths
        .iter()
        .map(|path| {
            resolve(origin, path)
                .map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("{path}: {e}") })
        })
        .collect()
}

impl RoutingTable {
    /// Build from configuration, resolving pinned paths against the origin.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let origin = config.origin_url()?;
        let pinned_urls = resolve_paths(&origin, "precache", &config.precache)?;
        let navigation = resolve_paths(&origin, "navigation_paths", &config.navigation_paths)?
            .iter()
            .map(|url| url.path().to_string())
            .collect();

        Ok(Self { origin, navigation, pinned_urls })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Absolute URLs of the pinned assets, in configured order.
    pub fn pinned_urls(&self) -> &[Url] {
        &self.pinned_urls
    }

    fn is_navigation(&self, path: &str) -> bool {
        self.navigation.iter().any(|p| p == path)
    }

    /// Path equal to a pinned path, or ending with one other than `/`.
    /// A pinned entry carrying a query only matches that exact query.
    fn is_pinned(&self, url: &Url) -> bool {
        let path = url.path();
        self.pinned_urls.iter().any(|pinned| {
            let p = pinned.path();
            let path_matches = p == path || (p != "/" && path.ends_with(p));
            path_matches && pinned.query().is_none_or(|q| url.query() == Some(q))
        })
    }

    /// Pick exactly one policy for a request.
    pub fn classify(&self, request: &Request) -> Route {
        if !request.is_get() {
            return Route::NotIntercepted;
        }
        if !is_same_origin(&self.origin, &request.url) {
            return Route::PassThrough;
        }

        if self.is_navigation(request.url.path()) {
            Route::NetworkFirst
        } else if self.is_pinned(&request.url) {
            Route::CacheFirst
        } else {
            Route::PassThrough
        }
    }
}

impl ServiceWorker {
    /// Handle one intercepted request.
    ///
    /// Requests are handled independently; nothing is shared between
    /// concurrent calls except the store.
    pub async fn handle_fetch(&self, event: FetchEvent) -> FetchOutcome {
        if !self.is_controlling(event.client_id.as_deref()) {
            return FetchOutcome::NotIntercepted;
        }

        let request = event.request;
        let route = self.routing().classify(&request);
        tracing::debug!(method = %request.method, url = %request.url, ?route, "fetch");

        let outcome = match route {
            Route::NotIntercepted => FetchOutcome::NotIntercepted,
            Route::NetworkFirst => self.network_first(&request).await,
            Route::CacheFirst => self.cache_first(&request).await,
            Route::PassThrough => self.pass_through(&request).await,
        };

        tracing::debug!(
            url = %request.url,
            ?route,
            source = ?outcome.source(),
            status = outcome.response().map(|r| r.status),
            "fetch handled"
        );
        outcome
    }

    async fn network_first(&self, request: &Request) -> FetchOutcome {
        let route = Route::NetworkFirst;
        match self.network().fetch(request).await {
            Ok(response) => {
                self.refill(request, &response);
                FetchOutcome::Respond { route, source: ResponseSource::Network, response }
            }
            Err(err) => {
                let err = Error::from(err);
                tracing::warn!(url = %request.url, error = %err, "network failed, falling back to store");

                if let Some(response) = self.lookup(request).await {
                    return FetchOutcome::Respond { route, source: ResponseSource::Cache, response };
                }

                if let Some(fallback) = self.offline_fallback()
                    && let Some(response) = self.lookup(&Request::get(fallback.clone())).await
                {
                    return FetchOutcome::Respond { route, source: ResponseSource::OfflineFallback, response };
                }

                FetchOutcome::Unavailable { route, reason: err.to_string() }
            }
        }
    }

    async fn cache_first(&self, request: &Request) -> FetchOutcome {
        let route = Route::CacheFirst;
        if let Some(response) = self.lookup(request).await {
            return FetchOutcome::Respond { route, source: ResponseSource::Cache, response };
        }

        match self.network().fetch(request).await {
            Ok(response) => {
                self.refill(request, &response);
                FetchOutcome::Respond { route, source: ResponseSource::Network, response }
            }
            Err(err) => {
                tracing::error!(url = %request.url, error = %err, "fetch failed, likely offline");
                FetchOutcome::Respond {
                    route,
                    source: ResponseSource::Synthetic,
                    response: Response::service_unavailable(),
                }
            }
        }
    }

    async fn pass_through(&self, request: &Request) -> FetchOutcome {
        let route = Route::PassThrough;
        match self.network().fetch(request).await {
            Ok(response) => FetchOutcome::Respond { route, source: ResponseSource::Network, response },
            Err(err) => {
                let err = Error::from(err);
                tracing::warn!(url = %request.url, error = %err, "pass-through fetch failed");
                FetchOutcome::Unavailable { route, reason: err.to_string() }
            }
        }
    }

    /// Store a copy of a cacheable response without delaying the caller.
    fn refill(&self, request: &Request, response: &Response) {
        if response.is_cacheable() {
            self.spawn_store_write(request.clone(), response.clone());
        } else {
            tracing::debug!(
                url = %request.url,
                status = response.status,
                response_type = %response.response_type,
                "not caching response"
            );
        }
    }

    /// Store read that treats storage errors as a miss.
    async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.storage().match_request(self.cache_name(), request).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "store lookup failed");
                None
            }
        }
    }
}
